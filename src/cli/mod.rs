use crate::config::{Config, LLMProvider, ProcessMode};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// History Buff - 多智能体驱动的历史问题研究与报告生成工具
#[derive(Parser, Debug)]
#[command(name = "history-buff")]
#[command(
    about = "Answers historical questions with a crew of AI agents and writes a markdown timeline and report."
)]
#[command(version)]
pub struct Args {
    /// 研究主题，未指定时交互式输入
    #[arg(short, long)]
    pub topic: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 任务编排方式 (sequential, hierarchical)
    #[arg(short, long)]
    pub process: Option<ProcessMode>,

    /// 智能体模型的provider (openai, gemini, anthropic, deepseek, ollama)
    #[arg(long)]
    pub agent_provider: Option<LLMProvider>,

    /// 智能体使用的模型
    #[arg(long)]
    pub agent_model: Option<String>,

    /// 工具模型的provider
    #[arg(long)]
    pub tool_provider: Option<LLMProvider>,

    /// 工具适配器使用的模型
    #[arg(long)]
    pub tool_model: Option<String>,

    /// 运行结束后输出阶段耗时与内存统计
    #[arg(long)]
    pub telemetry: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置，CLI参数覆盖配置文件
    pub fn into_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }
        if let Some(process) = self.process {
            config.process = process;
        }

        if let Some(provider) = &self.agent_provider {
            config.agent_llm.provider = provider.clone();
        }
        if let Some(model) = &self.agent_model {
            config.agent_llm.model = model.clone();
        }
        if let Some(provider) = &self.tool_provider {
            config.tool_llm.provider = provider.clone();
        }
        if let Some(model) = &self.tool_model {
            config.tool_llm.model = model.clone();
        }

        config.telemetry |= self.telemetry;
        config.verbose |= self.verbose;

        Ok(config)
    }

    /// 先补全凭据再确定主题，凭据缺失时不会进入交互输入
    pub fn prepare_run<L, R, W>(
        &self,
        config: &Config,
        lookup: L,
        input: R,
        prompt: W,
    ) -> Result<(Config, String)>
    where
        L: Fn(&str) -> Option<String>,
        R: BufRead,
        W: Write,
    {
        let config = config.with_credentials(lookup)?;
        let topic = self.resolve_topic(input, prompt)?;
        Ok((config, topic))
    }

    /// 主题：优先使用 --topic，否则从输入流读取一行
    pub fn resolve_topic<R: BufRead, W: Write>(&self, input: R, prompt: W) -> Result<String> {
        match &self.topic {
            Some(topic) => Ok(topic.clone()),
            None => prompt_topic(input, prompt),
        }
    }
}

/// 交互式读取主题
pub fn prompt_topic<R: BufRead, W: Write>(mut input: R, mut prompt: W) -> Result<String> {
    write!(prompt, "Enter the topic for the history report: ")?;
    prompt.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read topic from stdin")?;
    Ok(line.trim().to_string())
}

// Include tests
#[cfg(test)]
mod tests;
