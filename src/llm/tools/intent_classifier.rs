//! 问题意图分类工具

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ToolError, ToolKind, request_structured, schema_hint};
use crate::llm::client::CompletionBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Factual,
    Hypothetical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Academic,
    Casual,
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntentClassification {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub intent: Intent,
}

const SYSTEM_PROMPT: &str =
    "You classify historical questions. Answer with a single JSON object and nothing else.";

/// 将历史问题分类为事实型/假设型，学术/闲聊
#[derive(Clone)]
pub struct IntentClassifierTool {
    llm: Arc<dyn CompletionBackend>,
}

impl IntentClassifierTool {
    pub const KIND: ToolKind = ToolKind::IntentClassifier;

    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self { llm }
    }

    fn render_prompt(query: &str) -> String {
        format!(
            r#"Classify this historical query: {query}
Output JSON format: {{"type": "factual" | "hypothetical", "intent": "academic" | "casual"}}
JSON schema:
{schema}"#,
            query = query,
            schema = schema_hint::<IntentClassification>()
        )
    }

    pub async fn classify(&self, query: &str) -> Result<IntentClassification, ToolError> {
        request_structured(
            self.llm.as_ref(),
            Self::KIND,
            SYSTEM_PROMPT,
            &Self::render_prompt(query),
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(tool = %Self::KIND, "intent classification failed: {}", e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow!("429 Too Many Requests"))
        }
    }

    #[tokio::test]
    async fn test_classify_factual_academic() {
        let tool = IntentClassifierTool::new(Arc::new(Fixed(Some(
            r#"{"type": "factual", "intent": "academic"}"#,
        ))));

        let result = tool.classify("Why did Rome fall?").await.unwrap();
        assert_eq!(result.query_type, QueryType::Factual);
        assert_eq!(result.intent, Intent::Academic);
    }

    #[tokio::test]
    async fn test_classify_hypothetical_casual() {
        let tool = IntentClassifierTool::new(Arc::new(Fixed(Some(
            "Sure!\n{\"type\": \"hypothetical\", \"intent\": \"casual\"}",
        ))));

        let result = tool
            .classify("What if Carthage had won?")
            .await
            .unwrap();
        assert_eq!(result.query_type, QueryType::Hypothetical);
        assert_eq!(result.intent, Intent::Casual);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_error_value() {
        for raw in [
            "factual, academic",
            r#"{"type": "factual/hypothetical", "intent": "academic/casual"}"#,
            r#"{"type": "factual"}"#,
        ] {
            let tool = IntentClassifierTool::new(Arc::new(Fixed(Some(raw))));
            let err = tool.classify("q").await.unwrap_err();
            assert!(matches!(err, ToolError::MalformedResponse { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn test_service_failure_returns_error_value() {
        let tool = IntentClassifierTool::new(Arc::new(Fixed(None)));
        let err = tool.classify("q").await.unwrap_err();
        assert_eq!(err.tool(), ToolKind::IntentClassifier);
        assert!(err.sentinel()["error"].as_str().unwrap().contains("429"));
    }

    #[test]
    fn test_classification_serializes_type_field() {
        let value = serde_json::to_value(IntentClassification {
            query_type: QueryType::Factual,
            intent: Intent::Casual,
        })
        .unwrap();
        assert_eq!(value["type"], "factual");
        assert_eq!(value["intent"], "casual");
    }
}
