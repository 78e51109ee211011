//! 智能体名册：角色、目标、背景设定与可用工具

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use crate::config::ConfigError;
use crate::generator::template::{TemplateError, TemplateInputs};
use crate::llm::tools::ToolKind;

/// 内置的智能体定义，配置文件不存在时使用
pub const DEFAULT_AGENTS_YAML: &str = include_str!("../../config/agents.yaml");

/// 智能体角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    QueryDecipherer,
    TemporalSpecialist,
    Researcher,
    TimelineAgent,
    ReportingAnalyst,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::QueryDecipherer,
        AgentRole::TemporalSpecialist,
        AgentRole::Researcher,
        AgentRole::TimelineAgent,
        AgentRole::ReportingAnalyst,
    ];

    /// agents.yaml中的键
    pub fn key(&self) -> &'static str {
        match self {
            AgentRole::QueryDecipherer => "query_decipherer",
            AgentRole::TemporalSpecialist => "temporal_specialist",
            AgentRole::Researcher => "researcher",
            AgentRole::TimelineAgent => "timeline_agent",
            AgentRole::ReportingAnalyst => "reporting_analyst",
        }
    }

    /// 角色允许使用的工具
    pub const fn permitted_tools(&self) -> &'static [ToolKind] {
        match self {
            AgentRole::QueryDecipherer => &[ToolKind::IntentClassifier],
            AgentRole::TemporalSpecialist => &[ToolKind::Chrono],
            AgentRole::Researcher => &[ToolKind::WebSearch],
            AgentRole::TimelineAgent => &[ToolKind::TimelineBuilder],
            AgentRole::ReportingAnalyst => &[ToolKind::MarkdownFormatter],
        }
    }

    pub fn permits(&self, tool: ToolKind) -> bool {
        self.permitted_tools().contains(&tool)
    }

    /// 模板渲染失败时使用的简化设定
    fn fallback_profile(&self, topic: &str) -> AgentProfile {
        let (role, goal, backstory) = match self {
            AgentRole::QueryDecipherer => (
                "Query Decipherer",
                format!("Understand what the user wants to know about {}", topic),
                "A reference librarian who turns vague questions into precise research briefs.",
            ),
            AgentRole::TemporalSpecialist => (
                "Temporal Specialist",
                format!("Place {} in time and name its key events", topic),
                "A chronologist who dates events and periods with care.",
            ),
            AgentRole::Researcher => (
                "Historical Researcher",
                format!("Gather reliable sources about {}", topic),
                "A historian who reads widely and cites carefully.",
            ),
            AgentRole::TimelineAgent => (
                "Timeline Builder",
                format!("Build a clear timeline of {}", topic),
                "A chronicler who turns research notes into ordered timelines.",
            ),
            AgentRole::ReportingAnalyst => (
                "Reporting Analyst",
                format!("Write a complete report about {}", topic),
                "An analyst who writes well-structured, sourced historical reports.",
            ),
        };
        AgentProfile {
            role: role.to_string(),
            goal,
            backstory: backstory.to_string(),
            tools: self.permitted_tools().to_vec(),
        }
    }
}

impl Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.key() == s.trim())
            .ok_or_else(|| format!("Unknown agent: {}", s))
    }
}

/// 渲染后的智能体设定
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<ToolKind>,
}

impl AgentProfile {
    /// 智能体的系统提示词
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.tools.is_empty() {
            let names = self
                .tools
                .iter()
                .map(ToolKind::name)
                .collect::<Vec<_>>()
                .join(", ");
            prompt.push_str(&format!(
                "\nYou have been given the findings of these tools: {}. Treat entries marked \"error\" as unavailable data, never as facts.",
                names
            ));
        }
        prompt
    }

    /// hierarchical模式下的manager设定
    pub fn manager() -> Self {
        Self {
            role: "Crew Manager".to_string(),
            goal: "Delegate each task to the right specialist and keep the crew focused on the user's question".to_string(),
            backstory: "A seasoned editor-in-chief who coordinates historians, researchers and writers.".to_string(),
            tools: vec![],
        }
    }
}

#[derive(Debug, Deserialize)]
struct AgentYaml {
    role: String,
    goal: String,
    backstory: String,
    #[serde(default)]
    tools: Option<Vec<String>>,
}

/// 全部智能体的设定
#[derive(Debug, Clone)]
pub struct Roster {
    profiles: HashMap<AgentRole, AgentProfile>,
}

impl Roster {
    /// 读取智能体定义文件，文件不存在时使用内置定义
    pub fn load(path: &Path, inputs: &TemplateInputs) -> Result<Self> {
        if path.exists() {
            let yaml = std::fs::read_to_string(path)
                .context(format!("Failed to read agents config: {:?}", path))?;
            Self::from_yaml(&yaml, inputs)
                .context(format!("Invalid agents config: {:?}", path))
        } else {
            tracing::debug!(path = %path.display(), "agents config not found, using built-in roster");
            Self::from_yaml(DEFAULT_AGENTS_YAML, inputs)
        }
    }

    pub fn from_yaml(yaml: &str, inputs: &TemplateInputs) -> Result<Self> {
        let raw: HashMap<String, AgentYaml> =
            serde_yaml::from_str(yaml).context("Failed to parse agents yaml")?;

        for name in raw.keys() {
            if name.parse::<AgentRole>().is_err() {
                tracing::warn!(agent = %name, "ignoring unknown agent in agents config");
            }
        }

        let mut profiles = HashMap::new();
        for role in AgentRole::ALL {
            let profile = match raw.get(role.key()) {
                Some(entry) => Self::build_profile(role, entry, inputs)?,
                None => {
                    tracing::warn!(agent = %role, "agent missing from config, using built-in profile");
                    role.fallback_profile(inputs.topic())
                }
            };
            profiles.insert(role, profile);
        }

        Ok(Self { profiles })
    }

    fn build_profile(
        role: AgentRole,
        entry: &AgentYaml,
        inputs: &TemplateInputs,
    ) -> Result<AgentProfile, ConfigError> {
        let tools = match &entry.tools {
            None => role.permitted_tools().to_vec(),
            Some(names) => {
                let mut tools = Vec::with_capacity(names.len());
                for name in names {
                    let tool = name.parse::<ToolKind>().map_err(|_| ConfigError::UnknownTool {
                        agent: role.key().to_string(),
                        tool: name.clone(),
                    })?;
                    if !role.permits(tool) {
                        return Err(ConfigError::ToolNotPermitted {
                            agent: role.key().to_string(),
                            tool: name.clone(),
                        });
                    }
                    tools.push(tool);
                }
                tools
            }
        };

        match Self::render_profile(entry, inputs, &tools) {
            Ok(profile) => Ok(profile),
            Err(e) => {
                tracing::warn!(agent = %role, "agent template not renderable ({}), using simplified profile", e);
                Ok(AgentProfile {
                    tools,
                    ..role.fallback_profile(inputs.topic())
                })
            }
        }
    }

    fn render_profile(
        entry: &AgentYaml,
        inputs: &TemplateInputs,
        tools: &[ToolKind],
    ) -> Result<AgentProfile, TemplateError> {
        Ok(AgentProfile {
            role: inputs.render(&entry.role)?,
            goal: inputs.render(&entry.goal)?,
            backstory: inputs.render(&entry.backstory)?,
            tools: tools.to_vec(),
        })
    }

    pub fn profile(&self, role: AgentRole) -> &AgentProfile {
        // from_yaml为每个角色都填充了设定
        &self.profiles[&role]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::types::Query;

    fn inputs() -> TemplateInputs {
        TemplateInputs::new(&Query::new("Roman Empire").unwrap(), 2025)
    }

    #[test]
    fn test_default_roster_covers_every_role() {
        let roster = Roster::from_yaml(DEFAULT_AGENTS_YAML, &inputs()).unwrap();
        for role in AgentRole::ALL {
            let profile = roster.profile(role);
            assert!(!profile.role.is_empty());
            assert!(!profile.goal.contains('{'), "{:?} goal not rendered", role);
            assert_eq!(profile.tools, role.permitted_tools());
        }
    }

    #[test]
    fn test_permitted_tools_mapping() {
        assert!(AgentRole::Researcher.permits(ToolKind::WebSearch));
        assert!(!AgentRole::Researcher.permits(ToolKind::Chrono));
        assert!(AgentRole::TemporalSpecialist.permits(ToolKind::Chrono));
        assert!(AgentRole::ReportingAnalyst.permits(ToolKind::MarkdownFormatter));
    }

    #[test]
    fn test_unpermitted_tool_rejected() {
        let yaml = r#"
researcher:
  role: Researcher
  goal: Research {topic}
  backstory: Curious.
  tools: [chrono]
"#;
        let err = Roster::from_yaml(yaml, &inputs()).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(
            config_err,
            &ConfigError::ToolNotPermitted {
                agent: "researcher".to_string(),
                tool: "chrono".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let yaml = r#"
researcher:
  role: Researcher
  goal: Research {topic}
  backstory: Curious.
  tools: [ScrapeWebsiteTool]
"#;
        let err = Roster::from_yaml(yaml, &inputs()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownTool { .. })
        ));
    }

    #[test]
    fn test_missing_template_key_falls_back() {
        let yaml = r#"
researcher:
  role: "{topic} Senior Data Researcher"
  goal: Uncover developments in {topic} during the {era}
  backstory: Seasoned.
"#;
        let roster = Roster::from_yaml(yaml, &inputs()).unwrap();
        let profile = roster.profile(AgentRole::Researcher);
        assert_eq!(profile.role, "Historical Researcher");
        assert!(profile.goal.contains("Roman Empire"));
        // 未配置的角色使用内置设定
        assert_eq!(
            roster.profile(AgentRole::TimelineAgent).role,
            "Timeline Builder"
        );
    }

    #[test]
    fn test_system_prompt_mentions_role_goal_and_tools() {
        let roster = Roster::from_yaml(DEFAULT_AGENTS_YAML, &inputs()).unwrap();
        let prompt = roster.profile(AgentRole::Researcher).system_prompt();
        assert!(prompt.starts_with("You are "));
        assert!(prompt.contains("Your personal goal is:"));
        assert!(prompt.contains("web_search"));
        assert!(!AgentProfile::manager().system_prompt().contains("tools"));
    }
}
