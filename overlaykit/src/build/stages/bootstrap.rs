//! Task: Runtime bootstrap.

use super::{BuildCtx, log_task_error, task_start};
use crate::pipeline::{PipelineTask, StageReport, TaskResult};
use crate::runtime::{InstallOutcome, RuntimeInstaller};
use async_trait::async_trait;
use overlaykit_shared::BuildError;
use std::sync::Arc;

pub struct RuntimeBootstrapTask;

#[async_trait]
impl PipelineTask<BuildCtx> for RuntimeBootstrapTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> TaskResult {
        let task_name = self.name();
        task_start(&ctx, task_name);

        let installer =
            RuntimeInstaller::new(&ctx.layout, Arc::clone(&ctx.collaborators.unpacker));
        let outcome = installer
            .ensure_runtime(&ctx.options.version)
            .await
            .inspect_err(|e| log_task_error(task_name, e))
            .map_err(|e| BuildError::Bootstrap(e.to_string()))?;

        let mut report = StageReport::new(task_name);
        if outcome == InstallOutcome::InstalledNow {
            report.record_written(installer.runtime_root());
        }
        Ok(report)
    }

    fn name(&self) -> &str {
        "runtime_bootstrap"
    }
}
