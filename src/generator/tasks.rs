//! 任务定义：描述模板、期望输出与输出文件

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::generator::pipeline::{Pipeline, StageDescriptor, StageId};
use crate::generator::roster::AgentRole;
use crate::generator::template::{TemplateError, TemplateInputs};

/// 内置的任务定义，配置文件不存在时使用
pub const DEFAULT_TASKS_YAML: &str = include_str!("../../config/tasks.yaml");

#[derive(Debug, Deserialize)]
struct TaskYaml {
    description: String,
    expected_output: String,
    #[serde(default)]
    output_file: Option<String>,
    #[serde(default)]
    agent: Option<String>,
}

/// 渲染后的任务
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub stage: StageId,
    pub description: String,
    pub expected_output: String,
    pub output_file: Option<String>,
    /// 模板无法渲染时为true，描述来自内置的简化版本
    pub simplified: bool,
}

impl TaskSpec {
    fn simplified(stage: StageId, topic: &str, output_file: Option<String>) -> Self {
        let (description, expected_output) = match stage {
            StageId::QueryAnalysis => (
                format!("Analyze the user's question about {}.", topic),
                format!("A short research brief about {}.", topic),
            ),
            StageId::TemporalContext => (
                format!("Identify the time period and key events of {}.", topic),
                format!("The period and key events of {}.", topic),
            ),
            StageId::Research => (
                format!("Research {} thoroughly.", topic),
                format!("The most relevant findings about {} with sources.", topic),
            ),
            StageId::TimelineCreation => (
                format!("Create a chronological timeline of {}.", topic),
                format!("A markdown timeline of {}.", topic),
            ),
            StageId::Reporting => (
                format!("Write a detailed report on {}.", topic),
                format!("A markdown report on {}.", topic),
            ),
        };
        Self {
            stage,
            description,
            expected_output,
            output_file,
            simplified: true,
        }
    }

    fn default_output_file(stage: StageId) -> Option<String> {
        match stage {
            StageId::TimelineCreation => Some("timeline.md".to_string()),
            StageId::Reporting => Some("full_report.md".to_string()),
            _ => None,
        }
    }
}

/// 全部任务
#[derive(Debug, Clone)]
pub struct TaskBook {
    tasks: HashMap<StageId, TaskSpec>,
}

impl TaskBook {
    /// 读取任务定义文件，文件不存在时使用内置定义
    pub fn load(path: &Path, pipeline: &Pipeline, inputs: &TemplateInputs) -> Result<Self> {
        if path.exists() {
            let yaml = std::fs::read_to_string(path)
                .context(format!("Failed to read tasks config: {:?}", path))?;
            Self::from_yaml(&yaml, pipeline, inputs)
                .context(format!("Invalid tasks config: {:?}", path))
        } else {
            tracing::debug!(path = %path.display(), "tasks config not found, using built-in tasks");
            Self::from_yaml(DEFAULT_TASKS_YAML, pipeline, inputs)
        }
    }

    pub fn from_yaml(yaml: &str, pipeline: &Pipeline, inputs: &TemplateInputs) -> Result<Self> {
        let raw: HashMap<String, TaskYaml> =
            serde_yaml::from_str(yaml).context("Failed to parse tasks yaml")?;

        for name in raw.keys() {
            if name.parse::<StageId>().is_err() {
                tracing::warn!(task = %name, "ignoring unknown task in tasks config");
            }
        }

        let mut tasks = HashMap::new();
        for descriptor in pipeline.stages() {
            let stage = descriptor.id;
            let spec = match raw.get(stage.key()) {
                Some(entry) => Self::build_task(descriptor, entry, inputs),
                None => {
                    tracing::warn!(task = %stage, "task missing from config, using simplified task");
                    TaskSpec::simplified(
                        stage,
                        inputs.topic(),
                        TaskSpec::default_output_file(stage),
                    )
                }
            };
            tasks.insert(stage, spec);
        }

        Ok(Self { tasks })
    }

    fn build_task(
        descriptor: &StageDescriptor,
        entry: &TaskYaml,
        inputs: &TemplateInputs,
    ) -> TaskSpec {
        let stage = descriptor.id;
        if let Some(agent) = &entry.agent
            && agent.parse::<AgentRole>().ok() != Some(descriptor.agent)
        {
            tracing::warn!(
                task = %stage,
                agent = %agent,
                "task names a different agent than the pipeline binds; the pipeline binding wins"
            );
        }

        match Self::render_task(stage, entry, inputs) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(task = %stage, "task template not renderable ({}), using simplified description", e);
                TaskSpec::simplified(stage, inputs.topic(), entry.output_file.clone())
            }
        }
    }

    fn render_task(
        stage: StageId,
        entry: &TaskYaml,
        inputs: &TemplateInputs,
    ) -> Result<TaskSpec, TemplateError> {
        Ok(TaskSpec {
            stage,
            description: inputs.render(&entry.description)?,
            expected_output: inputs.render(&entry.expected_output)?,
            output_file: entry.output_file.clone(),
            simplified: false,
        })
    }

    pub fn task(&self, stage: StageId) -> &TaskSpec {
        // from_yaml为流水线中的每个阶段都填充了任务
        &self.tasks[&stage]
    }
}
