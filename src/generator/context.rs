use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::Config,
    llm::{
        client::{CompletionBackend, LLMClient},
        search::{SearchBackend, SerperClient},
        tools::{
            ChronoTool, IntentClassifierTool, MarkdownFormatterTool, TimelineBuilderTool,
            WebSearchTool,
        },
    },
    memory::Memory,
};

/// 工具适配器集合，均共享工具模型与搜索后端
#[derive(Clone)]
pub struct ToolBox {
    pub intent: IntentClassifierTool,
    pub chrono: ChronoTool,
    pub search: WebSearchTool,
    pub timeline: TimelineBuilderTool,
    pub formatter: MarkdownFormatterTool,
}

impl ToolBox {
    pub fn new(tool_llm: Arc<dyn CompletionBackend>, search: Arc<dyn SearchBackend>) -> Self {
        Self {
            intent: IntentClassifierTool::new(tool_llm.clone()),
            chrono: ChronoTool::new(tool_llm.clone()),
            search: WebSearchTool::new(search),
            timeline: TimelineBuilderTool::new(tool_llm.clone()),
            formatter: MarkdownFormatterTool::new(tool_llm),
        }
    }
}

#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Config,
    /// 智能体使用的模型
    pub agent_llm: Arc<dyn CompletionBackend>,
    /// 工具适配器
    pub tools: ToolBox,
    /// 单次运行的记忆
    pub memory: Arc<RwLock<Memory>>,
    pub run_id: Uuid,
}

impl GeneratorContext {
    /// 创建新的生成器上下文，只构造客户端，不发起网络请求
    pub fn new(config: Config) -> Result<Self> {
        let agent_llm: Arc<dyn CompletionBackend> =
            Arc::new(LLMClient::new(config.agent_llm.clone())?);
        let tool_llm: Arc<dyn CompletionBackend> =
            Arc::new(LLMClient::new(config.tool_llm.clone())?);
        let search: Arc<dyn SearchBackend> = Arc::new(SerperClient::new(config.search.clone())?);

        Ok(Self::with_backends(config, agent_llm, tool_llm, search))
    }

    /// 使用指定的后端创建上下文
    pub fn with_backends(
        config: Config,
        agent_llm: Arc<dyn CompletionBackend>,
        tool_llm: Arc<dyn CompletionBackend>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            config,
            agent_llm,
            tools: ToolBox::new(tool_llm, search),
            memory: Arc::new(RwLock::new(Memory::new())),
            run_id: Uuid::new_v4(),
        }
    }

    /// 存储数据到 Memory，已存在的键会报错
    pub async fn store_to_memory<T>(&self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let mut memory = self.memory.write().await;
        memory.store_once(scope, key, data)
    }

    /// 从 Memory 获取数据
    pub async fn get_from_memory<T>(&self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a> + Send + Sync,
    {
        let memory = self.memory.read().await;
        memory.get(scope, key)
    }

    /// 获取Memory使用统计
    pub async fn get_memory_stats(&self) -> HashMap<String, usize> {
        let memory = self.memory.read().await;
        memory.get_usage_stats()
    }
}
