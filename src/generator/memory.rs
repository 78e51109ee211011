use crate::generator::context::GeneratorContext;
use crate::generator::pipeline::StageId;
use crate::generator::types::TaskResult;

pub struct MemoryScope;

impl MemoryScope {
    pub const TASK_RESULTS: &'static str = "task_results";
}

pub trait TaskResultRetriever {
    async fn store_task_result(&self, result: &TaskResult) -> anyhow::Result<()>;

    async fn get_task_result(&self, stage: StageId) -> Option<TaskResult>;
}

impl TaskResultRetriever for GeneratorContext {
    /// 存储阶段结果，每个阶段只能写入一次
    async fn store_task_result(&self, result: &TaskResult) -> anyhow::Result<()> {
        self.store_to_memory(MemoryScope::TASK_RESULTS, result.stage.key(), result)
            .await
    }

    /// 获取阶段结果
    async fn get_task_result(&self, stage: StageId) -> Option<TaskResult> {
        self.get_from_memory(MemoryScope::TASK_RESULTS, stage.key())
            .await
    }
}
