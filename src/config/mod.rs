use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 默认配置文件名（位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "history-buff.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    /// 该provider是否需要API KEY
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "gemini" | "google" => Ok(LLMProvider::Gemini),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 任务编排方式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    /// 严格按照拓扑顺序依次执行
    #[serde(rename = "sequential")]
    #[default]
    Sequential,
    /// 由manager智能体决定下一步执行哪个就绪任务，并下发委派说明
    #[serde(rename = "hierarchical")]
    Hierarchical,
}

impl std::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessMode::Sequential => write!(f, "sequential"),
            ProcessMode::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

impl std::str::FromStr for ProcessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(ProcessMode::Sequential),
            "hierarchical" => Ok(ProcessMode::Hierarchical),
            _ => Err(format!("Unknown process mode: {}", s)),
        }
    }
}

/// 配置相关的错误
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required API credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),
    #[error("unknown tool `{tool}` configured for agent `{agent}`")]
    UnknownTool { agent: String, tool: String },
    #[error("tool `{tool}` is not permitted for agent `{agent}`")]
    ToolNotPermitted { agent: String, tool: String },
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 输出目录，timeline.md 与 full_report.md 写入其中
    pub output_path: PathBuf,

    /// 智能体定义文件
    pub agents_config_path: PathBuf,

    /// 任务定义文件
    pub tasks_config_path: PathBuf,

    /// 任务编排方式
    pub process: ProcessMode,

    /// 智能体（含manager）使用的模型
    pub agent_llm: LLMConfig,

    /// 工具适配器使用的模型
    pub tool_llm: LLMConfig,

    /// 网络搜索配置
    pub search: SearchConfig,

    /// 任务模板中的 current_year，未配置时取当前年份
    pub current_year: Option<i32>,

    /// 运行结束后输出阶段耗时与内存统计
    pub telemetry: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY，为空时从 `api_key_env` 指向的环境变量读取
    pub api_key: String,

    /// 保存API KEY的环境变量名
    pub api_key_env: String,

    /// LLM API基地址，为空时使用provider默认地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 调用次数（1表示失败不重试）
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 网络搜索配置（Serper）
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,

    /// 为空时从 `api_key_env` 指向的环境变量读取
    pub api_key: String,

    pub api_key_env: String,

    /// 每次搜索返回的结果条数
    pub results_per_query: u32,

    /// research阶段最多发起的搜索次数
    pub max_queries: usize,

    pub timeout_seconds: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 按照 显式路径 > 工作目录下的默认文件 > 内置默认值 的顺序加载配置
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let default_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 任务模板中使用的年份
    pub fn resolve_current_year(&self) -> i32 {
        use chrono::Datelike;
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    /// 补全三类凭据（智能体模型、工具模型、搜索），并列出所有缺失项。
    ///
    /// `lookup` 用于读取环境变量；任何缺失都会在发起网络调用前整体报告。
    pub fn with_credentials<L>(&self, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut resolved = self.clone();
        let mut missing = Vec::new();

        let resolve = |current: &str, env_name: &str| -> Option<String> {
            if !current.trim().is_empty() {
                return Some(current.to_string());
            }
            lookup(env_name).filter(|value| !value.trim().is_empty())
        };

        if resolved.agent_llm.provider.requires_api_key() {
            match resolve(&resolved.agent_llm.api_key, &resolved.agent_llm.api_key_env) {
                Some(key) => resolved.agent_llm.api_key = key,
                None => note_missing(&mut missing, &resolved.agent_llm.api_key_env),
            }
        }

        if resolved.tool_llm.provider.requires_api_key() {
            match resolve(&resolved.tool_llm.api_key, &resolved.tool_llm.api_key_env) {
                Some(key) => resolved.tool_llm.api_key = key,
                None => note_missing(&mut missing, &resolved.tool_llm.api_key_env),
            }
        }

        match resolve(&resolved.search.api_key, &resolved.search.api_key_env) {
            Some(key) => resolved.search.api_key = key,
            None => note_missing(&mut missing, &resolved.search.api_key_env),
        }

        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(ConfigError::MissingCredentials(missing))
        }
    }
}

/// 多个凭据共用同一个环境变量时只报告一次
fn note_missing(missing: &mut Vec<String>, env_name: &str) {
    if !missing.iter().any(|name| name == env_name) {
        missing.push(env_name.to_string());
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("."),
            agents_config_path: PathBuf::from("config/agents.yaml"),
            tasks_config_path: PathBuf::from("config/tasks.yaml"),
            process: ProcessMode::default(),
            agent_llm: LLMConfig::default(),
            tool_llm: LLMConfig::gemini_default(),
            search: SearchConfig::default(),
            current_year: None,
            telemetry: false,
            verbose: false,
        }
    }
}

impl LLMConfig {
    /// 工具适配器默认使用的Gemini配置
    pub fn gemini_default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            api_key_env: String::from("GEMINI_API_KEY"),
            model: String::from("gemini-1.5-flash"),
            temperature: 0.7,
            ..Self::default()
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: String::new(),
            api_key_env: String::from("OPENAI_API_KEY"),
            api_base_url: String::new(),
            model: String::from("gpt-4o-mini"),
            max_tokens: 4096,
            temperature: 0.2,
            retry_attempts: 1,
            retry_delay_ms: 2000,
            timeout_seconds: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://google.serper.dev/search"),
            api_key: String::new(),
            api_key_env: String::from("SERPER_API_KEY"),
            results_per_query: 10,
            max_queries: 3,
            timeout_seconds: 30,
        }
    }
}
