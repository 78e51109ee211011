use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::ProcessMode;
use crate::generator::context::GeneratorContext;
use crate::generator::manager::ManagerAgent;
use crate::generator::outlet::Outlet;
use crate::generator::pipeline::{Pipeline, StageId};
use crate::generator::roster::Roster;
use crate::generator::stages::agent_for;
use crate::generator::step_forward_agent::StagePlan;
use crate::generator::tasks::TaskBook;
use crate::generator::types::{Query, TaskResult};
use crate::generator::workflow::TimingScope;

/// 一次运行的产出
#[derive(Debug, Clone)]
pub struct CrewOutput {
    /// 按执行顺序排列的阶段结果
    pub results: Vec<TaskResult>,
    /// 最后一个阶段的文本
    pub final_output: String,
    pub saved_files: Vec<PathBuf>,
}

/// 多智能体编排器
pub struct CrewOrchestrator<'a, O: Outlet> {
    pipeline: &'a Pipeline,
    roster: &'a Roster,
    tasks: &'a TaskBook,
    outlet: &'a O,
}

impl<'a, O: Outlet> CrewOrchestrator<'a, O> {
    pub fn new(pipeline: &'a Pipeline, roster: &'a Roster, tasks: &'a TaskBook, outlet: &'a O) -> Self {
        Self {
            pipeline,
            roster,
            tasks,
            outlet,
        }
    }

    /// 按选定的编排方式执行全部阶段
    pub async fn kickoff(
        &self,
        context: &GeneratorContext,
        query: &Query,
        process: ProcessMode,
        timing: &mut TimingScope,
    ) -> Result<CrewOutput> {
        println!("🚀 开始执行History Buff流程（{}模式）...", process);

        let mut output = CrewOutput {
            results: Vec::with_capacity(self.pipeline.stages().len()),
            final_output: String::new(),
            saved_files: Vec::new(),
        };

        match process {
            ProcessMode::Sequential => {
                for descriptor in self.pipeline.stages() {
                    self.execute_stage(context, query, descriptor.id, None, timing, &mut output)
                        .await?;
                }
            }
            ProcessMode::Hierarchical => {
                let manager = ManagerAgent::new();
                let mut completed = HashSet::new();
                let mut order = Vec::new();
                loop {
                    let ready: Vec<_> = self
                        .pipeline
                        .ready_stages(&completed)
                        .into_iter()
                        .filter_map(|stage| self.pipeline.descriptor(stage))
                        .collect();
                    let Some(delegation) = manager
                        .delegate(context, query, &ready, self.roster, self.tasks, &order)
                        .await
                    else {
                        break;
                    };
                    println!("🧭 Manager委派任务: {}", delegation.stage.display_name());
                    self.execute_stage(
                        context,
                        query,
                        delegation.stage,
                        delegation.brief,
                        timing,
                        &mut output,
                    )
                    .await?;
                    completed.insert(delegation.stage);
                    order.push(delegation.stage);
                }
            }
        }

        output.final_output = output
            .results
            .iter()
            .find(|result| result.stage == self.pipeline.final_stage())
            .map(|result| result.content.clone())
            .ok_or_else(|| anyhow!("最终阶段 {} 没有产出", self.pipeline.final_stage()))?;

        println!("✓ History Buff流程执行完毕");
        Ok(output)
    }

    async fn execute_stage(
        &self,
        context: &GeneratorContext,
        query: &Query,
        stage: StageId,
        brief: Option<String>,
        timing: &mut TimingScope,
        output: &mut CrewOutput,
    ) -> Result<()> {
        let descriptor = self
            .pipeline
            .descriptor(stage)
            .ok_or_else(|| anyhow!("阶段 {} 不在流水线中", stage))?;
        let task = self.tasks.task(stage);
        let plan = StagePlan {
            query,
            task,
            profile: self.roster.profile(descriptor.agent),
            descriptor,
            brief,
        };

        timing.start_phase(stage.key());
        let result = agent_for(stage).execute(context, &plan).await?;
        timing.end_phase(stage.key());

        // 阶段完成后立即落盘，后续阶段失败时已完成的文件仍然保留
        if let Some(file_name) = &task.output_file {
            let path = self
                .outlet
                .persist(
                    file_name,
                    &result.content,
                    &format!("{} ({})", query, stage.display_name()),
                )
                .await?;
            output.saved_files.push(path);
        }

        output.results.push(result);
        Ok(())
    }
}
