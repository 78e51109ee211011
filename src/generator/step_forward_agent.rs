use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::generator::context::GeneratorContext;
use crate::generator::memory::TaskResultRetriever;
use crate::generator::pipeline::{StageDescriptor, StageId};
use crate::generator::roster::AgentProfile;
use crate::generator::tasks::TaskSpec;
use crate::generator::types::{Query, TaskResult};

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 开头的说明性指令
    pub opening_instruction: String,
    /// 结尾的强调性指令
    pub closing_instruction: String,
}

/// 工具调用得到的材料
#[derive(Debug, Clone, Default)]
pub struct ToolMaterial {
    /// (标题, 内容) 形式插入到prompt中
    pub sections: Vec<(String, String)>,
    /// 写入TaskResult的结构化数据，工具失败时为空
    pub structured: Option<Value>,
}

impl ToolMaterial {
    pub fn section(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push((title.into(), body.into()));
        self
    }

    pub fn with_structured(mut self, structured: Option<Value>) -> Self {
        self.structured = structured;
        self
    }
}

/// 执行一个阶段所需的全部设定
#[derive(Debug, Clone)]
pub struct StagePlan<'a> {
    pub query: &'a Query,
    pub task: &'a TaskSpec,
    pub profile: &'a AgentProfile,
    pub descriptor: &'a StageDescriptor,
    /// hierarchical模式下manager给出的委派说明
    pub brief: Option<String>,
}

/// 标准的阶段Prompt构建器
pub struct GeneratorPromptBuilder {
    template: PromptTemplate,
}

impl GeneratorPromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// 构建系统提示词和用户提示词，上游结果原样插入
    pub fn build_prompts(
        &self,
        plan: &StagePlan<'_>,
        upstream: &[TaskResult],
        material: &ToolMaterial,
    ) -> (String, String) {
        let system_prompt = plan.profile.system_prompt();

        let mut prompt = String::new();
        prompt.push_str(&self.template.opening_instruction);
        prompt.push_str("\n\n");

        prompt.push_str(&format!("## Task\n{}\n\n", plan.task.description));
        prompt.push_str(&format!(
            "## Expected output\n{}\n\n",
            plan.task.expected_output
        ));

        if let Some(brief) = &plan.brief {
            prompt.push_str(&format!("## Instructions from the crew manager\n{}\n\n", brief));
        }

        if !upstream.is_empty() {
            prompt.push_str("## Context from earlier tasks\n");
            for result in upstream {
                prompt.push_str(&format!(
                    "### {}\n{}\n\n",
                    result.stage.display_name(),
                    result.content
                ));
            }
        }

        if !material.sections.is_empty() {
            prompt.push_str("## Tool findings\n");
            for (title, body) in &material.sections {
                prompt.push_str(&format!("### {}\n{}\n\n", title, body));
            }
        }

        prompt.push_str(&self.template.closing_instruction);

        (system_prompt, prompt)
    }
}

/// 流水线阶段智能体
#[async_trait]
pub trait StepForwardAgent: Send + Sync {
    fn stage(&self) -> StageId;

    /// Prompt模板配置
    fn prompt_template(&self) -> PromptTemplate;

    /// 调用本阶段允许使用的工具，工具失败不会中断阶段
    async fn gather_tool_material(
        &self,
        _context: &GeneratorContext,
        _query: &Query,
    ) -> Result<ToolMaterial> {
        Ok(ToolMaterial::default())
    }

    /// 可选的后处理钩子
    async fn post_process(&self, _context: &GeneratorContext, content: String) -> Result<String> {
        Ok(content)
    }

    /// 默认实现的execute方法：校验上游、调用工具、调用模型、写入记忆
    async fn execute(&self, context: &GeneratorContext, plan: &StagePlan<'_>) -> Result<TaskResult> {
        let stage = self.stage();
        println!(
            "🤖 [{}] {} 开始执行...",
            stage.display_name(),
            plan.profile.role
        );

        // 1. 上游结果必须齐全
        let mut upstream = Vec::with_capacity(plan.descriptor.upstream.len());
        for dependency in plan.descriptor.upstream {
            let result = context
                .get_task_result(*dependency)
                .await
                .ok_or_else(|| anyhow!("必需的上游结果 {} 不可用（阶段 {}）", dependency, stage))?;
            upstream.push(result);
        }

        // 2. 工具材料
        let material = self.gather_tool_material(context, plan.query).await?;

        // 3. 构建prompt
        let builder = GeneratorPromptBuilder::new(self.prompt_template());
        let (system_prompt, user_prompt) = builder.build_prompts(plan, &upstream, &material);
        tracing::debug!(stage = %stage, "user prompt:\n{}", user_prompt);

        // 4. 调用智能体模型，失败时中断运行
        let draft = context
            .agent_llm
            .complete(&system_prompt, &user_prompt)
            .await
            .with_context(|| format!("阶段 {} 的模型调用失败", stage))?;

        // 5. 后处理
        let content = self.post_process(context, draft).await?;

        // 6. 存储结果
        let result = TaskResult::new(stage, plan.descriptor.agent, content, material.structured);
        context.store_task_result(&result).await?;

        println!("✅ Sub-Agent [{}]执行完成", stage.display_name());
        Ok(result)
    }
}
