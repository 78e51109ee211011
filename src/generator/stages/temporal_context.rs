use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::pipeline::StageId;
use crate::generator::stages::json_block;
use crate::generator::step_forward_agent::{PromptTemplate, StepForwardAgent, ToolMaterial};
use crate::generator::types::Query;

/// 时间背景 - 确定时间范围、地域与关键事件
#[derive(Default)]
pub struct TemporalContextAgent;

#[async_trait]
impl StepForwardAgent for TemporalContextAgent {
    fn stage(&self) -> StageId {
        StageId::TemporalContext
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            opening_instruction:
                "Establish the temporal and geographical context of the question.".to_string(),
            closing_instruction: r#"
## Requirements
- Give the start and end of the period covered
- List the key events with their years
- Say so explicitly when the extracted dates are unavailable or uncertain"#
                .to_string(),
        }
    }

    async fn gather_tool_material(
        &self,
        context: &GeneratorContext,
        query: &Query,
    ) -> Result<ToolMaterial> {
        let (body, structured) = match context.tools.chrono.extract(query.as_str()).await {
            Ok(temporal) => {
                let value = serde_json::to_value(&temporal)?;
                (json_block(&value), Some(value))
            }
            Err(err) => (json_block(&err.sentinel()), None),
        };

        Ok(ToolMaterial::default()
            .section("Extracted temporal frame", body)
            .with_structured(structured))
    }
}
