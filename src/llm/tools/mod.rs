//! 工具适配器：把领域输入转换为一次外部服务调用，再把结果整理回领域类型。
//!
//! 所有适配器都不会向上抛出服务错误，而是记录日志并返回 [`ToolError`]，
//! 调用方据此决定如何降级。

use rig::extractor::ExtractionError;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use crate::llm::client::CompletionBackend;

pub mod chrono_extractor;
pub mod intent_classifier;
pub mod markdown_formatter;
pub mod timeline_builder;
pub mod web_search;

pub use chrono_extractor::{ChronoTool, TemporalContext};
pub use intent_classifier::{Intent, IntentClassification, IntentClassifierTool, QueryType};
pub use markdown_formatter::MarkdownFormatterTool;
pub use timeline_builder::TimelineBuilderTool;
pub use web_search::{SearchResult, WebSearchTool, search_sentinel};

/// 工具种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    IntentClassifier,
    Chrono,
    WebSearch,
    TimelineBuilder,
    MarkdownFormatter,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::IntentClassifier,
        ToolKind::Chrono,
        ToolKind::WebSearch,
        ToolKind::TimelineBuilder,
        ToolKind::MarkdownFormatter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::IntentClassifier => "intent_classifier",
            ToolKind::Chrono => "chrono",
            ToolKind::WebSearch => "web_search",
            ToolKind::TimelineBuilder => "timeline_builder",
            ToolKind::MarkdownFormatter => "markdown_formatter",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 同时接受旧版配置里的类名写法
        match s.trim().to_lowercase().as_str() {
            "intent_classifier" | "intentclassifiertool" => Ok(ToolKind::IntentClassifier),
            "chrono" | "chronoapitool" => Ok(ToolKind::Chrono),
            "web_search" | "enhancedserpertool" | "serperdevtool" => Ok(ToolKind::WebSearch),
            "timeline_builder" | "timelinebuildertool" => Ok(ToolKind::TimelineBuilder),
            "markdown_formatter" | "markdownformattertool" => Ok(ToolKind::MarkdownFormatter),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

/// 工具调用失败
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// 网络、配额或服务端错误
    #[error("{tool} service call failed: {reason}")]
    Service { tool: ToolKind, reason: String },
    /// 服务有响应，但内容无法解析为期望的结构
    #[error("{tool} returned a malformed response: {reason}")]
    MalformedResponse { tool: ToolKind, reason: String },
}

impl ToolError {
    pub fn service(tool: ToolKind, err: impl std::fmt::Display) -> Self {
        ToolError::Service {
            tool,
            reason: err.to_string(),
        }
    }

    pub fn tool(&self) -> ToolKind {
        match self {
            ToolError::Service { tool, .. } | ToolError::MalformedResponse { tool, .. } => *tool,
        }
    }

    /// 供prompt使用的错误形态：`{"error": reason}`
    pub fn sentinel(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

/// 去掉包裹整段输出的代码块，内部的代码块原样保留
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 第一行是语言标记，最后必须以围栏结尾才算整体包裹
    match rest
        .split_once('\n')
        .and_then(|(_, body)| body.strip_suffix("```"))
    {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// 请求结构化输出：真实客户端走rig的Extractor，其他后端解析文本回答
pub(crate) async fn request_structured<T>(
    llm: &dyn CompletionBackend,
    tool: ToolKind,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T, ToolError>
where
    T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    if let Some(client) = llm.extractor() {
        return client
            .extract::<T>(system_prompt, user_prompt)
            .await
            .map_err(|e| extraction_failure(tool, e));
    }

    let raw = llm
        .complete(system_prompt, user_prompt)
        .await
        .map_err(|e| ToolError::service(tool, format!("{:#}", e)))?;
    parse_json_object(tool, &raw)
}

/// 模型有回答但没有给出可用数据时算作格式错误，其余都是服务错误
fn extraction_failure(tool: ToolKind, err: anyhow::Error) -> ToolError {
    match err.downcast_ref::<ExtractionError>() {
        Some(ExtractionError::NoData | ExtractionError::DeserializationError(_)) => {
            ToolError::MalformedResponse {
                tool,
                reason: err.to_string(),
            }
        }
        _ => ToolError::service(tool, format!("{:#}", err)),
    }
}

/// 从模型输出中解析JSON对象，容忍代码块包裹与前后的说明文字
pub fn parse_json_object<T>(tool: ToolKind, raw: &str) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    let body = extract_json_object(raw).ok_or_else(|| ToolError::MalformedResponse {
        tool,
        reason: "no JSON object in response".to_string(),
    })?;

    serde_json::from_str(body).map_err(|e| ToolError::MalformedResponse {
        tool,
        reason: e.to_string(),
    })
}

/// 找到模型输出中第一个完整的JSON对象，跳过前面的说明文字和代码块
pub fn extract_json_object(raw: &str) -> Option<&str> {
    raw.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => Some(&raw[start..start + stream.byte_offset()]),
            _ => None,
        }
    })
}

/// 渲染JSON schema，嵌入到要求结构化输出的prompt中
pub(crate) fn schema_hint<T: schemars::JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
