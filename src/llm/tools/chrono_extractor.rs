//! 时间背景提取工具

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ToolError, ToolKind, request_structured, schema_hint};
use crate::llm::client::CompletionBackend;

/// 历史问题涉及的时间范围与关键事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemporalContext {
    /// 起始年份，公元前用负数表示
    pub start_year: i32,
    /// 结束年份，公元前用负数表示
    pub end_year: i32,
    #[serde(default)]
    pub key_events: Vec<String>,
}

const SYSTEM_PROMPT: &str = "You are a historian who extracts the temporal frame of historical questions. Answer with JSON only.";

/// 从问题中提取时间背景（起止年份与关键事件）
#[derive(Clone)]
pub struct ChronoTool {
    llm: Arc<dyn CompletionBackend>,
}

impl ChronoTool {
    pub const KIND: ToolKind = ToolKind::Chrono;

    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self { llm }
    }

    fn render_prompt(query: &str) -> String {
        format!(
            r#"Extract a timeline JSON from: {query}
Output format: {{"start_year": <int>, "end_year": <int>, "key_events": [<string>, ...]}}
Use negative numbers for years before the common era.
JSON schema:
{schema}"#,
            query = query,
            schema = schema_hint::<TemporalContext>()
        )
    }

    pub async fn extract(&self, query: &str) -> Result<TemporalContext, ToolError> {
        let context: TemporalContext = request_structured(
            self.llm.as_ref(),
            Self::KIND,
            SYSTEM_PROMPT,
            &Self::render_prompt(query),
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(tool = %Self::KIND, "temporal extraction failed: {}", e);
        })?;

        if context.start_year > context.end_year {
            let err = ToolError::MalformedResponse {
                tool: Self::KIND,
                reason: format!(
                    "start_year {} is after end_year {}",
                    context.start_year, context.end_year
                ),
            };
            tracing::warn!(tool = %Self::KIND, "{}", err);
            return Err(err);
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    struct Fixed(Result<String, String>);

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.0.clone().map_err(|e| anyhow!(e))
        }
    }

    fn tool(answer: Result<&str, &str>) -> ChronoTool {
        ChronoTool::new(Arc::new(Fixed(
            answer.map(str::to_string).map_err(str::to_string),
        )))
    }

    #[test]
    fn test_prompt_mentions_query_and_fields() {
        let prompt = ChronoTool::render_prompt("Roman Empire");
        assert!(prompt.contains("Extract a timeline JSON from: Roman Empire"));
        assert!(prompt.contains("start_year"));
        assert!(prompt.contains("key_events"));
    }

    #[tokio::test]
    async fn test_extract_parses_json() {
        let tool = tool(Ok(
            r#"```json
{"start_year": -27, "end_year": 476, "key_events": ["Augustus becomes emperor", "Fall of the West"]}
```"#,
        ));

        let context = tool.extract("Roman Empire").await.unwrap();
        assert_eq!(context.start_year, -27);
        assert_eq!(context.end_year, 476);
        assert_eq!(context.key_events.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_missing_events_defaults_to_empty() {
        let tool = tool(Ok(r#"{"start_year": 1914, "end_year": 1918}"#));
        let context = tool.extract("World War I").await.unwrap();
        assert!(context.key_events.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_returns_error_value() {
        for raw in [
            "The Roman Empire lasted a long time.",
            r#"{"start_year": "early", "end_year": 476}"#,
            r#"{"start_year": -27, "end_year": 476, "key_events": ["unterminated"#,
            "",
        ] {
            let err = tool(Ok(raw)).extract("Roman Empire").await.unwrap_err();
            assert!(
                matches!(err, ToolError::MalformedResponse { .. }),
                "raw {:?} gave {:?}",
                raw,
                err
            );
            assert!(err.sentinel().get("error").is_some());
        }
    }

    #[tokio::test]
    async fn test_inverted_range_is_malformed() {
        let err = tool(Ok(r#"{"start_year": 500, "end_year": 100, "key_events": []}"#))
            .extract("x")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_service_failure_returns_error_value() {
        let err = tool(Err("connection reset"))
            .extract("Roman Empire")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Service {
                tool: ToolKind::Chrono,
                ..
            }
        ));
        assert!(err.to_string().contains("connection reset"));
    }
}
