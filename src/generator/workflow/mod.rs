use crate::config::{Config, ConfigError};
use crate::generator::context::GeneratorContext;
use crate::generator::orchestrator::CrewOrchestrator;
use crate::generator::outlet::DiskOutlet;
use crate::generator::pipeline::Pipeline;
use crate::generator::roster::Roster;
use crate::generator::tasks::TaskBook;
use crate::generator::template::TemplateInputs;
use crate::generator::types::Query;

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: std::time::Instant,
    phase_start_times: HashMap<String, std::time::Instant>,
    /// 按完成顺序记录
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), std::time::Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .push((phase_name.to_string(), duration));
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 一次运行的摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub topic: String,
    /// 最终报告
    pub report: String,
    pub saved_files: Vec<PathBuf>,
    pub timing_report: String,
}

/// 启动历史报告工作流，凭据从环境变量读取
pub async fn launch(config: &Config, topic: &str) -> Result<RunSummary> {
    launch_with(config, topic, |name| std::env::var(name).ok(), GeneratorContext::new).await
}

/// 启动工作流：先校验问题与凭据，任何缺失都在构建客户端之前报告
pub async fn launch_with<L, B>(
    config: &Config,
    topic: &str,
    lookup: L,
    build_context: B,
) -> Result<RunSummary>
where
    L: Fn(&str) -> Option<String>,
    B: FnOnce(Config) -> Result<GeneratorContext>,
{
    let query = Query::new(topic)?;
    let config = config.with_credentials(lookup).inspect_err(|e| {
        if let ConfigError::MissingCredentials(missing) = e {
            tracing::error!(missing = ?missing, "credential check failed");
        }
    })?;

    let context = build_context(config)?;
    run(&context, &query).await
}

/// 在已构建的上下文中执行全部阶段
pub async fn run(context: &GeneratorContext, query: &Query) -> Result<RunSummary> {
    let config = &context.config;
    let mut timing = TimingScope::new();

    let inputs = TemplateInputs::new(query, config.resolve_current_year());
    let pipeline = Pipeline::standard()?;
    let roster = Roster::load(&config.agents_config_path, &inputs)?;
    let tasks = TaskBook::load(&config.tasks_config_path, &pipeline, &inputs)?;
    let outlet = DiskOutlet::new(config.output_path.clone());

    tracing::info!(run_id = %context.run_id, topic = %query, "starting run");

    let orchestrator = CrewOrchestrator::new(&pipeline, &roster, &tasks, &outlet);
    let output = orchestrator
        .kickoff(context, query, config.process, &mut timing)
        .await?;

    let timing_report = timing.generate_timing_report();
    if config.telemetry {
        tracing::info!(run_id = %context.run_id, "run timing:\n{}", timing_report);
        for (scope, bytes) in context.get_memory_stats().await {
            tracing::info!(run_id = %context.run_id, scope = %scope, bytes, "memory usage");
        }
    }

    Ok(RunSummary {
        run_id: context.run_id,
        topic: query.to_string(),
        report: output.final_output,
        saved_files: output.saved_files,
        timing_report,
    })
}
