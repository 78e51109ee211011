//! 网络搜索客户端（Serper）

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::SearchConfig;

/// 原始搜索能力，返回搜索服务的JSON响应
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<Value>;
}

/// Serper搜索客户端
#[derive(Clone)]
pub struct SerperClient {
    config: SearchConfig,
    http: reqwest::Client,
}

impl SerperClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build search http client")?;
        Ok(Self { config, http })
    }

    fn request_body(&self, query: &str) -> Value {
        json!({
            "q": query,
            "num": self.config.results_per_query,
        })
    }
}

#[async_trait]
impl SearchBackend for SerperClient {
    async fn search(&self, query: &str) -> Result<Value> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .header("X-API-KEY", &self.config.api_key)
            .json(&self.request_body(query))
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search service returned an error status")?;

        response
            .json::<Value>()
            .await
            .context("search response is not valid JSON")
    }
}
