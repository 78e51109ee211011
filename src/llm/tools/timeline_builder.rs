//! 时间线生成工具

use std::sync::Arc;

use super::{ToolError, ToolKind};
use crate::llm::client::CompletionBackend;

const SYSTEM_PROMPT: &str = "You are a meticulous chronicler who writes markdown timelines.";

/// 将事件列表整理为按年份分组的markdown时间线
#[derive(Clone)]
pub struct TimelineBuilderTool {
    llm: Arc<dyn CompletionBackend>,
}

impl TimelineBuilderTool {
    pub const KIND: ToolKind = ToolKind::TimelineBuilder;

    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self { llm }
    }

    fn render_prompt(events: &[String]) -> String {
        let listed = events
            .iter()
            .map(|event| format!("- {}", event))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Create a markdown timeline from these events:\n{}\n\
             Format: Use '###' for years, and '-' for events under each year.\n\
             Include event dates, titles, and brief descriptions.",
            listed
        )
    }

    /// 返回模型给出的原始markdown，不校验格式
    pub async fn build(&self, events: &[String]) -> Result<String, ToolError> {
        self.llm
            .complete(SYSTEM_PROMPT, &Self::render_prompt(events))
            .await
            .map_err(|e| {
                tracing::warn!(tool = %Self::KIND, "timeline build failed: {:#}", e);
                ToolError::service(Self::KIND, format!("{:#}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_every_event_and_format() {
        let events = vec![
            "27 BC: Augustus becomes the first emperor".to_string(),
            "476 AD: Deposition of Romulus Augustulus".to_string(),
        ];
        let prompt = TimelineBuilderTool::render_prompt(&events);

        assert!(prompt.contains("- 27 BC: Augustus becomes the first emperor"));
        assert!(prompt.contains("- 476 AD: Deposition of Romulus Augustulus"));
        assert!(prompt.contains("'###' for years"));
    }
}
