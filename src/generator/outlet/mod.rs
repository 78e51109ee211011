use anyhow::{Context, Result};
use markdown::mdast::Node;
use std::fs;
use std::path::PathBuf;

use crate::llm::tools::strip_code_fence;

const EMPTY_PLACEHOLDER: &str = "_No content was produced for this document._";

pub trait Outlet {
    /// 保存一份markdown文档，返回写入的路径
    async fn persist(&self, file_name: &str, markdown: &str, title: &str) -> Result<PathBuf>;
}

/// 写入本地输出目录，每次运行覆盖同名文件
pub struct DiskOutlet {
    output_dir: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Outlet for DiskOutlet {
    async fn persist(&self, file_name: &str, markdown: &str, title: &str) -> Result<PathBuf> {
        let output_file_path = self.output_dir.join(file_name);

        // 确保父目录存在
        if let Some(parent_dir) = output_file_path.parent()
            && !parent_dir.exists()
        {
            fs::create_dir_all(parent_dir)
                .context(format!("Failed to create output directory: {:?}", parent_dir))?;
        }

        let document = normalize_markdown(markdown, title);
        fs::write(&output_file_path, document)
            .context(format!("Failed to write document: {:?}", output_file_path))?;

        println!("💾 已保存文档: {}", output_file_path.display());
        Ok(output_file_path)
    }
}

/// 去掉外层代码块；保证文档非空且至少有一个标题
pub fn normalize_markdown(content: &str, title: &str) -> String {
    let body = strip_code_fence(content);
    let body = if body.is_empty() {
        EMPTY_PLACEHOLDER
    } else {
        body
    };

    if has_heading(body) {
        format!("{}\n", body)
    } else {
        format!("# {}\n\n{}\n", title, body)
    }
}

fn has_heading(markdown: &str) -> bool {
    match markdown::to_mdast(markdown, &markdown::ParseOptions::default()) {
        Ok(root) => contains_heading(&root),
        Err(_) => false,
    }
}

fn contains_heading(node: &Node) -> bool {
    if matches!(node, Node::Heading(_)) {
        return true;
    }
    node.children()
        .map(|children| children.iter().any(contains_heading))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_document_with_heading() {
        let doc = normalize_markdown("# Roman Empire\n\nText.", "Report");
        assert_eq!(doc, "# Roman Empire\n\nText.\n");
    }

    #[test]
    fn test_nested_heading_is_detected() {
        let doc = normalize_markdown("Intro line.\n\n### 27 BC\n- Augustus", "Timeline");
        assert!(doc.starts_with("Intro line."));
    }

    #[test]
    fn test_adds_title_when_missing() {
        let doc = normalize_markdown("- 27 BC: Augustus", "Timeline");
        assert!(doc.starts_with("# Timeline\n\n- 27 BC: Augustus"));
    }

    #[test]
    fn test_strips_fence_and_fills_empty() {
        let doc = normalize_markdown("```markdown\n## Sources\n- a\n```", "Report");
        assert_eq!(doc, "## Sources\n- a\n");

        let empty = normalize_markdown("   ", "Report");
        assert!(empty.starts_with("# Report"));
        assert!(empty.contains(EMPTY_PLACEHOLDER));
    }

    #[test]
    fn test_inner_code_block_does_not_truncate_document() {
        let doc = normalize_markdown(
            "```markdown\n# Roman Empire\n\n## Latin motto\n```\nSPQR\n```\n\n## Fall\nThe West fell in 476 AD.\n```",
            "Report",
        );
        assert!(doc.starts_with("# Roman Empire"));
        assert!(doc.contains("SPQR"));
        assert!(doc.contains("The West fell in 476 AD."));
    }

    #[test]
    fn test_leading_code_block_keeps_rest_of_document() {
        let doc = normalize_markdown(
            "```text\nSPQR\n```\n\n# Roman Empire\n\nThe West fell in 476 AD.",
            "Report",
        );
        assert!(doc.starts_with("```text\nSPQR"));
        assert!(doc.contains("The West fell in 476 AD."));
        assert!(!doc.contains("# Report"));
    }

    #[test]
    fn test_hash_without_space_is_not_heading() {
        let doc = normalize_markdown("#hashtag history", "Report");
        assert!(doc.starts_with("# Report"));
    }

    #[tokio::test]
    async fn test_disk_outlet_overwrites_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let outlet = DiskOutlet::new(dir.path().join("out"));

        let path = outlet.persist("timeline.md", "old", "Timeline").await.unwrap();
        let path2 = outlet
            .persist("timeline.md", "# New timeline", "Timeline")
            .await
            .unwrap();

        assert_eq!(path, path2);
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "# New timeline\n"
        );
    }
}
