use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::generator::context::GeneratorContext;
use crate::generator::memory::TaskResultRetriever;
use crate::generator::pipeline::StageId;
use crate::generator::stages::json_block;
use crate::generator::step_forward_agent::{PromptTemplate, StepForwardAgent, ToolMaterial};
use crate::generator::types::Query;
use crate::llm::tools::{SearchResult, TemporalContext, WebSearchTool};

/// 单次搜索的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySearch {
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// 搜索失败的原因，失败时results为空
    #[serde(default)]
    pub error: Option<String>,
}

/// 研究阶段的结构化产出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub key_events: Vec<String>,
    pub searches: Vec<QuerySearch>,
}

/// 研究 - 基于时间背景检索资料
#[derive(Default)]
pub struct ResearchAgent;

impl ResearchAgent {
    /// 主题本身加上由关键事件构造的查询，总数不超过max_queries
    pub fn build_queries(topic: &str, key_events: &[String], max_queries: usize) -> Vec<String> {
        let mut queries = vec![topic.to_string()];
        queries.extend(
            key_events
                .iter()
                .take(max_queries.saturating_sub(1))
                .map(|event| format!("{} {}", topic, event)),
        );
        queries
    }
}

#[async_trait]
impl StepForwardAgent for ResearchAgent {
    fn stage(&self) -> StageId {
        StageId::Research
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            opening_instruction:
                "Research the question using the temporal context and the search results below."
                    .to_string(),
            closing_instruction: r#"
## Requirements
- Keep only findings that are relevant to the question
- Give the source link for every finding
- Do not treat search entries marked "error" as findings"#
                .to_string(),
        }
    }

    async fn gather_tool_material(
        &self,
        context: &GeneratorContext,
        query: &Query,
    ) -> Result<ToolMaterial> {
        let key_events = context
            .get_task_result(StageId::TemporalContext)
            .await
            .and_then(|result| result.structured_as::<TemporalContext>())
            .map(|temporal| temporal.key_events)
            .unwrap_or_default();

        let queries = Self::build_queries(
            query.as_str(),
            &key_events,
            context.config.search.max_queries,
        );

        let mut material = ToolMaterial::default();
        let mut searches = Vec::with_capacity(queries.len());
        // 逐个查询，不并发
        for search_query in queries {
            let outcome = context.tools.search.search(&search_query).await;
            material = material.section(
                format!("Search results for \"{}\"", search_query),
                json_block(&WebSearchTool::render(&outcome)),
            );
            searches.push(match outcome {
                Ok(results) => QuerySearch {
                    query: search_query,
                    results,
                    error: None,
                },
                Err(err) => QuerySearch {
                    query: search_query,
                    results: vec![],
                    error: Some(err.to_string()),
                },
            });
        }

        let findings = ResearchFindings {
            key_events,
            searches,
        };
        Ok(material.with_structured(Some(serde_json::to_value(&findings)?)))
    }
}
