use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::memory::TaskResultRetriever;
use crate::generator::pipeline::StageId;
use crate::generator::stages::json_block;
use crate::generator::stages::research::ResearchFindings;
use crate::generator::step_forward_agent::{PromptTemplate, StepForwardAgent, ToolMaterial};
use crate::generator::types::Query;

/// 时间线 - 把研究结果整理为按年份排列的时间线
#[derive(Default)]
pub struct TimelineCreationAgent;

impl TimelineCreationAgent {
    /// 关键事件在前，随后是带日期的搜索结果
    pub fn collect_events(findings: &ResearchFindings) -> Vec<String> {
        let mut events = findings.key_events.clone();
        for result in findings.searches.iter().flat_map(|s| s.results.iter()) {
            if let (Some(date), Some(title)) = (&result.date, &result.title) {
                let event = format!("{}: {}", date, title);
                if !events.contains(&event) {
                    events.push(event);
                }
            }
        }
        events
    }
}

#[async_trait]
impl StepForwardAgent for TimelineCreationAgent {
    fn stage(&self) -> StageId {
        StageId::TimelineCreation
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            opening_instruction: "Build a chronological timeline from the research findings."
                .to_string(),
            closing_instruction: r#"
## Requirements
- Start with a level-one markdown heading naming the subject
- Use one '###' heading per year and '-' bullets for the events of that year
- Keep only events supported by the research
- Output markdown only, without code fences"#
                .to_string(),
        }
    }

    async fn gather_tool_material(
        &self,
        context: &GeneratorContext,
        _query: &Query,
    ) -> Result<ToolMaterial> {
        let research = context.get_task_result(StageId::Research).await;
        let mut events = research
            .as_ref()
            .and_then(|result| result.structured_as::<ResearchFindings>())
            .map(|findings| Self::collect_events(&findings))
            .unwrap_or_default();
        if events.is_empty()
            && let Some(research) = &research
        {
            events.push(research.content.clone());
        }

        let body = match context.tools.timeline.build(&events).await {
            Ok(draft) => draft,
            Err(err) => json_block(&err.sentinel()),
        };

        Ok(ToolMaterial::default()
            .section("Draft timeline", body)
            .with_structured(Some(serde_json::json!({ "events": events }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stages::research::QuerySearch;
    use crate::llm::tools::SearchResult;

    #[test]
    fn test_collect_events_merges_dated_results() {
        let findings = ResearchFindings {
            key_events: vec!["27 BC: Augustus becomes emperor".to_string()],
            searches: vec![QuerySearch {
                query: "Roman Empire".to_string(),
                results: vec![
                    SearchResult {
                        title: Some("Sack of Rome".to_string()),
                        date: Some("410 AD".to_string()),
                        ..Default::default()
                    },
                    SearchResult {
                        title: Some("Undated overview".to_string()),
                        ..Default::default()
                    },
                ],
                error: None,
            }],
        };

        assert_eq!(
            TimelineCreationAgent::collect_events(&findings),
            vec!["27 BC: Augustus becomes emperor", "410 AD: Sack of Rome"]
        );
    }
}
