use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::pipeline::StageId;
use crate::generator::roster::AgentRole;

/// 用户提交的历史问题，单次运行内不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(topic: &str) -> Result<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("topic must not be empty");
        }
        Ok(Self(topic.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单个任务阶段的产出，写入运行内存后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub stage: StageId,
    pub agent: AgentRole,
    /// 智能体给出的文本（多为markdown）
    pub content: String,
    /// 工具得到的结构化数据，工具失败时为空
    pub structured: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn new(stage: StageId, agent: AgentRole, content: String, structured: Option<Value>) -> Self {
        Self {
            stage,
            agent,
            content,
            structured,
            created_at: Utc::now(),
        }
    }

    /// 反序列化结构化数据
    pub fn structured_as<T>(&self) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        self.structured
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
