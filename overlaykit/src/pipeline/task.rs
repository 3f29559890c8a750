//! Generic task trait for pipeline execution.

use super::report::StageReport;
use async_trait::async_trait;
use overlaykit_shared::BuildError;

/// Result of one task.
///
/// `Ok` carries the task's report, which may still hold per-entry errors.
/// `Err` is a fatal failure (bootstrap, patch) that ends the run immediately.
pub type TaskResult = Result<StageReport, BuildError>;

/// Trait for tasks that can be executed in a pipeline.
///
/// Tasks run with a shared context, which is cloned per task.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    /// Execute the task with the shared pipeline context.
    async fn run(self: Box<Self>, ctx: Ctx) -> TaskResult;

    /// Get human-readable task name for logging.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
