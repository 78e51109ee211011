//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;

mod providers;

use providers::ProviderClient;

/// 单轮补全能力，流水线与工具适配器只依赖这个接口
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// 支持schema约束提取的真实客户端；其他实现的结构化输出从文本回答中解析
    fn extractor(&self) -> Option<&LLMClient> {
        None
    }
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端，不会发起网络请求
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// 通用重试逻辑，retry_attempts为1时即只调用一次
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts;
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tracing::warn!(
                        model = %self.config.model,
                        attempt = retries,
                        max_attempts = max_retries,
                        "model call failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    fn timed_out(&self, timeout: Duration) -> anyhow::Error {
        anyhow!(
            "model `{}` did not answer within {}s",
            self.config.model,
            timeout.as_secs()
        )
    }

    /// 单轮对话（不使用工具）
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self
            .client
            .create_agent(&self.config.model, system_prompt, &self.config)?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| async {
            match tokio::time::timeout(timeout, agent.prompt(user_prompt)).await {
                Ok(result) => result,
                Err(_) => Err(self.timed_out(timeout)),
            }
        })
        .await
    }

    /// 数据提取方法，失败时错误链中保留 `rig::extractor::ExtractionError`
    pub async fn extract<T>(&self, system_prompt: &str, user_prompt: &str) -> Result<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let extractor =
            self.client
                .create_extractor::<T>(&self.config.model, system_prompt, &self.config)?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| async {
            match tokio::time::timeout(timeout, extractor.extract(user_prompt)).await {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(_) => Err(self.timed_out(timeout)),
            }
        })
        .await
    }
}

#[async_trait]
impl CompletionBackend for LLMClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompt(system_prompt, user_prompt).await
    }

    fn extractor(&self) -> Option<&LLMClient> {
        Some(self)
    }
}
