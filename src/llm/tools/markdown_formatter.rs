//! markdown排版工具

use std::sync::Arc;

use super::{ToolError, ToolKind};
use crate::llm::client::CompletionBackend;

const SYSTEM_PROMPT: &str = "You are a technical editor who formats documents as clean markdown. Preserve every fact and citation you are given.";

#[derive(Clone)]
pub struct MarkdownFormatterTool {
    llm: Arc<dyn CompletionBackend>,
}

impl MarkdownFormatterTool {
    pub const KIND: ToolKind = ToolKind::MarkdownFormatter;

    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self { llm }
    }

    fn render_prompt(content: &str, format_type: &str) -> String {
        format!(
            "Format the following content as a {format_type} in markdown.\n\
             Requirements:\n\
             - Proper headings (#, ##, ###)\n\
             - Bullet points for lists\n\
             - Citations for any sources referenced\n\
             - A table of contents at the beginning\n\n\
             Content:\n{content}"
        )
    }

    /// 返回排版后的原始文本，不做结构校验
    pub async fn format(&self, content: &str, format_type: &str) -> Result<String, ToolError> {
        self.llm
            .complete(SYSTEM_PROMPT, &Self::render_prompt(content, format_type))
            .await
            .map_err(|e| {
                tracing::warn!(tool = %Self::KIND, "markdown formatting failed: {:#}", e);
                ToolError::service(Self::KIND, format!("{:#}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_content_and_requirements() {
        let prompt = MarkdownFormatterTool::render_prompt("Rome rose and fell.", "report");
        assert!(prompt.starts_with("Format the following content as a report"));
        assert!(prompt.contains("table of contents"));
        assert!(prompt.contains("Citations"));
        assert!(prompt.ends_with("Rome rose and fell."));
    }
}
