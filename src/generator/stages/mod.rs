//! 五个流水线阶段的智能体实现

use serde_json::Value;

use crate::generator::pipeline::StageId;
use crate::generator::step_forward_agent::StepForwardAgent;

pub mod query_analysis;
pub mod reporting;
pub mod research;
pub mod temporal_context;
pub mod timeline_creation;

pub use query_analysis::QueryAnalysisAgent;
pub use reporting::ReportingAgent;
pub use research::ResearchAgent;
pub use temporal_context::TemporalContextAgent;
pub use timeline_creation::TimelineCreationAgent;

/// 阶段对应的智能体
pub fn agent_for(stage: StageId) -> Box<dyn StepForwardAgent> {
    match stage {
        StageId::QueryAnalysis => Box::new(QueryAnalysisAgent),
        StageId::TemporalContext => Box::new(TemporalContextAgent),
        StageId::Research => Box::new(ResearchAgent),
        StageId::TimelineCreation => Box::new(TimelineCreationAgent),
        StageId::Reporting => Box::new(ReportingAgent),
    }
}

/// 以json代码块形式插入prompt
pub(crate) fn json_block(value: &Value) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_for_every_stage() {
        for stage in StageId::ALL {
            assert_eq!(agent_for(stage).stage(), stage);
        }
    }
}
