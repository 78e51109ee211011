use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::pipeline::StageId;
use crate::generator::stages::json_block;
use crate::generator::step_forward_agent::{PromptTemplate, StepForwardAgent, ToolMaterial};
use crate::generator::types::Query;

/// 问题解析 - 判断问题类型与用户意图，给出研究要点
#[derive(Default)]
pub struct QueryAnalysisAgent;

#[async_trait]
impl StepForwardAgent for QueryAnalysisAgent {
    fn stage(&self) -> StageId {
        StageId::QueryAnalysis
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            opening_instruction: "Analyze the historical question below and turn it into a research brief."
                .to_string(),
            closing_instruction: r#"
## Requirements
- State whether the question is factual or hypothetical
- State whether the user expects an academic or a casual answer
- List the sub-questions a complete answer must cover"#
                .to_string(),
        }
    }

    async fn gather_tool_material(
        &self,
        context: &GeneratorContext,
        query: &Query,
    ) -> Result<ToolMaterial> {
        let outcome = context.tools.intent.classify(query.as_str()).await;
        let (body, structured) = match outcome {
            Ok(classification) => {
                let value = serde_json::to_value(&classification)?;
                (json_block(&value), Some(value))
            }
            Err(err) => (json_block(&err.sentinel()), None),
        };

        Ok(ToolMaterial::default()
            .section(format!("Intent classification of \"{}\"", query), body)
            .with_structured(structured))
    }
}
