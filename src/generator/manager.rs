//! hierarchical模式下的manager：从就绪阶段中挑选下一个任务并给出委派说明

use serde::Deserialize;

use crate::generator::context::GeneratorContext;
use crate::generator::pipeline::{StageDescriptor, StageId};
use crate::generator::roster::{AgentProfile, Roster};
use crate::generator::tasks::TaskBook;
use crate::generator::types::Query;
use crate::llm::tools::extract_json_object;

#[derive(Debug, Deserialize)]
struct DelegationReply {
    next_task: String,
    #[serde(default)]
    instructions: Option<String>,
}

/// manager的决定
#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    pub stage: StageId,
    pub brief: Option<String>,
}

pub struct ManagerAgent {
    profile: AgentProfile,
}

impl Default for ManagerAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerAgent {
    pub fn new() -> Self {
        Self {
            profile: AgentProfile::manager(),
        }
    }

    fn render_prompt(
        query: &Query,
        ready: &[&StageDescriptor],
        roster: &Roster,
        tasks: &TaskBook,
        completed: &[StageId],
    ) -> String {
        let mut prompt = format!("The crew is answering a question about: {}\n\n", query);

        if completed.is_empty() {
            prompt.push_str("No task has been completed yet.\n\n");
        } else {
            let done = completed
                .iter()
                .map(StageId::key)
                .collect::<Vec<_>>()
                .join(", ");
            prompt.push_str(&format!("Completed tasks: {}\n\n", done));
        }

        prompt.push_str("Tasks that can run now:\n");
        for descriptor in ready {
            prompt.push_str(&format!(
                "- {} (assigned to {}): {}\n",
                descriptor.id.key(),
                roster.profile(descriptor.agent).role,
                tasks.task(descriptor.id).description
            ));
        }

        prompt.push_str(
            "\nPick the task to delegate next and write short instructions for its agent.\n\
             Answer with JSON only: {\"next_task\": \"<task key>\", \"instructions\": \"<text>\"}",
        );
        prompt
    }

    fn parse_reply(raw: &str, ready: &[StageId]) -> Option<Delegation> {
        let reply: DelegationReply = serde_json::from_str(extract_json_object(raw)?).ok()?;
        let stage = reply.next_task.parse::<StageId>().ok()?;
        if !ready.contains(&stage) {
            return None;
        }
        Some(Delegation {
            stage,
            brief: reply
                .instructions
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
        })
    }

    /// 选择下一个阶段；manager的回答不可用时退回到拓扑序中的第一个就绪阶段
    pub async fn delegate(
        &self,
        context: &GeneratorContext,
        query: &Query,
        ready: &[&StageDescriptor],
        roster: &Roster,
        tasks: &TaskBook,
        completed: &[StageId],
    ) -> Option<Delegation> {
        let fallback = Delegation {
            stage: ready.first()?.id,
            brief: None,
        };
        let ready_ids: Vec<StageId> = ready.iter().map(|descriptor| descriptor.id).collect();
        let prompt = Self::render_prompt(query, ready, roster, tasks, completed);
        match context
            .agent_llm
            .complete(&self.profile.system_prompt(), &prompt)
            .await
        {
            Ok(raw) => Some(Self::parse_reply(&raw, &ready_ids).unwrap_or_else(|| {
                tracing::warn!(
                    reply = %raw,
                    "manager reply did not name a ready task, delegating {}",
                    fallback.stage
                );
                fallback
            })),
            Err(e) => {
                tracing::warn!("manager call failed, delegating {}: {:#}", fallback.stage, e);
                Some(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::pipeline::Pipeline;
    use crate::generator::roster::{AgentRole, DEFAULT_AGENTS_YAML};
    use crate::generator::tasks::DEFAULT_TASKS_YAML;
    use crate::generator::template::TemplateInputs;

    #[test]
    fn test_parse_reply_accepts_ready_stage() {
        let raw = "```json\n{\"next_task\": \"research\", \"instructions\": \"Focus on primary sources.\"}\n```";
        let delegation = ManagerAgent::parse_reply(raw, &[StageId::Research]).unwrap();
        assert_eq!(delegation.stage, StageId::Research);
        assert_eq!(
            delegation.brief.as_deref(),
            Some("Focus on primary sources.")
        );
    }

    #[test]
    fn test_parse_reply_rejects_stage_that_is_not_ready() {
        let raw = r#"{"next_task": "reporting", "instructions": "Write it."}"#;
        assert!(ManagerAgent::parse_reply(raw, &[StageId::Research]).is_none());
    }

    #[test]
    fn test_parse_reply_rejects_prose() {
        assert!(ManagerAgent::parse_reply("Let the researcher go.", &[StageId::Research]).is_none());
    }

    #[test]
    fn test_parse_reply_drops_blank_instructions() {
        let raw = r#"{"next_task": "Timeline Creation", "instructions": "  "}"#;
        let delegation = ManagerAgent::parse_reply(raw, &[StageId::TimelineCreation]).unwrap();
        assert_eq!(delegation.stage, StageId::TimelineCreation);
        assert!(delegation.brief.is_none());
    }

    #[test]
    fn test_prompt_names_agent_bound_by_pipeline() {
        let pipeline = Pipeline::from_stages(vec![StageDescriptor {
            id: StageId::Research,
            agent: AgentRole::ReportingAnalyst,
            upstream: &[],
        }])
        .unwrap();
        let inputs = TemplateInputs::new(&Query::new("Roman Empire").unwrap(), 2025);
        let roster = Roster::from_yaml(DEFAULT_AGENTS_YAML, &inputs).unwrap();
        let tasks = TaskBook::from_yaml(DEFAULT_TASKS_YAML, &pipeline, &inputs).unwrap();
        let ready: Vec<_> = pipeline.stages().iter().collect();

        let prompt = ManagerAgent::render_prompt(
            &Query::new("Roman Empire").unwrap(),
            &ready,
            &roster,
            &tasks,
            &[],
        );
        assert!(prompt.contains("- research (assigned to Roman Empire Reporting Analyst)"));
        assert!(prompt.contains("No task has been completed yet."));
    }
}
