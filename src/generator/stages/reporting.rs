use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::pipeline::StageId;
use crate::generator::step_forward_agent::{PromptTemplate, StepForwardAgent};

const FORMAT_TYPE: &str = "historical report";

/// 报告 - 综合研究结果与时间线撰写最终报告
#[derive(Default)]
pub struct ReportingAgent;

#[async_trait]
impl StepForwardAgent for ReportingAgent {
    fn stage(&self) -> StageId {
        StageId::Reporting
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            opening_instruction:
                "Write the final report from the research findings and the timeline.".to_string(),
            closing_instruction: r#"
## Requirements
- Expand every relevant finding into its own section
- Cite the sources found during research
- Include the timeline where it helps the reader
- Output markdown only, without code fences"#
                .to_string(),
        }
    }

    /// 用markdown排版工具整理报告，失败时保留原稿
    async fn post_process(&self, context: &GeneratorContext, content: String) -> Result<String> {
        match context.tools.formatter.format(&content, FORMAT_TYPE).await {
            Ok(formatted) if !formatted.trim().is_empty() => Ok(formatted),
            Ok(_) => {
                tracing::warn!("markdown formatter returned nothing, keeping the draft report");
                Ok(content)
            }
            Err(err) => {
                tracing::warn!("markdown formatting failed, keeping the draft report: {}", err);
                Ok(content)
            }
        }
    }
}
