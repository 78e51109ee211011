//! 静态任务流水线：固定的五个阶段及其上游依赖。
//!
//! 阶段表本身就是一个拓扑序，`Pipeline::validate` 保证每个上游阶段都排在
//! 依赖它的阶段之前，从而不存在环。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use thiserror::Error;

use crate::generator::roster::AgentRole;

/// 阶段标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    QueryAnalysis,
    TemporalContext,
    Research,
    TimelineCreation,
    Reporting,
}

impl StageId {
    pub const ALL: [StageId; 5] = [
        StageId::QueryAnalysis,
        StageId::TemporalContext,
        StageId::Research,
        StageId::TimelineCreation,
        StageId::Reporting,
    ];

    /// tasks.yaml中的键
    pub fn key(&self) -> &'static str {
        match self {
            StageId::QueryAnalysis => "query_analysis",
            StageId::TemporalContext => "temporal_context",
            StageId::Research => "research",
            StageId::TimelineCreation => "timeline_creation",
            StageId::Reporting => "reporting",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::QueryAnalysis => "Query Analysis",
            StageId::TemporalContext => "Temporal Context",
            StageId::Research => "Research",
            StageId::TimelineCreation => "Timeline Creation",
            StageId::Reporting => "Reporting",
        }
    }
}

impl Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        StageId::ALL
            .into_iter()
            .find(|stage| stage.key() == normalized)
            .ok_or_else(|| format!("Unknown stage: {}", s))
    }
}

/// 阶段描述：绑定的智能体与允许读取的上游阶段
#[derive(Debug, Clone, PartialEq)]
pub struct StageDescriptor {
    pub id: StageId,
    pub agent: AgentRole,
    pub upstream: &'static [StageId],
}

/// 标准流水线
pub const PIPELINE: [StageDescriptor; 5] = [
    StageDescriptor {
        id: StageId::QueryAnalysis,
        agent: AgentRole::QueryDecipherer,
        upstream: &[],
    },
    StageDescriptor {
        id: StageId::TemporalContext,
        agent: AgentRole::TemporalSpecialist,
        upstream: &[StageId::QueryAnalysis],
    },
    StageDescriptor {
        id: StageId::Research,
        agent: AgentRole::Researcher,
        upstream: &[StageId::TemporalContext],
    },
    StageDescriptor {
        id: StageId::TimelineCreation,
        agent: AgentRole::TimelineAgent,
        upstream: &[StageId::Research],
    },
    StageDescriptor {
        id: StageId::Reporting,
        agent: AgentRole::ReportingAnalyst,
        upstream: &[StageId::Research, StageId::TimelineCreation],
    },
];

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("pipeline has no stages")]
    Empty,
    #[error("stage `{0}` is declared more than once")]
    DuplicateStage(StageId),
    #[error("stage `{stage}` depends on `{upstream}`, which does not run before it")]
    UnorderedDependency { stage: StageId, upstream: StageId },
}

/// 经过校验的流水线
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<StageDescriptor>,
}

impl Pipeline {
    pub fn standard() -> Result<Self, PipelineError> {
        Self::from_stages(PIPELINE.to_vec())
    }

    pub fn from_stages(stages: Vec<StageDescriptor>) -> Result<Self, PipelineError> {
        Self::validate(&stages)?;
        Ok(Self { stages })
    }

    /// 校验阶段表是合法的拓扑序
    pub fn validate(stages: &[StageDescriptor]) -> Result<(), PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut seen = HashSet::new();
        for stage in stages {
            for upstream in stage.upstream {
                if !seen.contains(upstream) {
                    return Err(PipelineError::UnorderedDependency {
                        stage: stage.id,
                        upstream: *upstream,
                    });
                }
            }
            if !seen.insert(stage.id) {
                return Err(PipelineError::DuplicateStage(stage.id));
            }
        }
        Ok(())
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    pub fn descriptor(&self, id: StageId) -> Option<&StageDescriptor> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    /// 尚未完成且上游均已完成的阶段，按拓扑序返回
    pub fn ready_stages(&self, completed: &HashSet<StageId>) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|stage| !completed.contains(&stage.id))
            .filter(|stage| stage.upstream.iter().all(|up| completed.contains(up)))
            .map(|stage| stage.id)
            .collect()
    }

    pub fn final_stage(&self) -> StageId {
        // validate保证非空
        self.stages
            .last()
            .map(|stage| stage.id)
            .unwrap_or(StageId::Reporting)
    }
}
