//! 网络搜索工具，将Serper的原始响应整理为统一的搜索结果

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{ToolError, ToolKind};
use crate::llm::search::SearchBackend;

/// 单条搜索结果，只保留这四个字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
    pub date: Option<String>,
}

impl SearchResult {
    fn from_organic(entry: &Value) -> Self {
        let field = |name: &str| entry.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            title: field("title"),
            link: field("link"),
            snippet: field("snippet"),
            date: field("date"),
        }
    }
}

/// 搜索失败时写入prompt的形态：只含一个错误标记的序列
pub fn search_sentinel(err: &ToolError) -> Value {
    json!([err.sentinel()])
}

#[derive(Clone)]
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl WebSearchTool {
    pub const KIND: ToolKind = ToolKind::WebSearch;

    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// 按搜索服务给出的相关性顺序返回结果，不重新排序
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ToolError> {
        let response = self.backend.search(query).await.map_err(|e| {
            tracing::warn!(tool = %Self::KIND, query, "search failed: {:#}", e);
            ToolError::service(Self::KIND, format!("{:#}", e))
        })?;

        Ok(Self::project(&response))
    }

    fn project(response: &Value) -> Vec<SearchResult> {
        response
            .get("organic")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(SearchResult::from_organic).collect())
            .unwrap_or_default()
    }

    /// 搜索结果的JSON形态，失败时为单元素错误序列
    pub fn render(outcome: &Result<Vec<SearchResult>, ToolError>) -> Value {
        match outcome {
            Ok(results) => serde_json::to_value(results).unwrap_or_else(|_| json!([])),
            Err(err) => search_sentinel(err),
        }
    }
}
