//! Task: Artifact patch.
//!
//! Wraps one [`ArtifactPatcher`]. Patchers only run against a runtime tree
//! that is confirmed present.

use super::{BuildCtx, log_task_error, task_start};
use crate::collab::ArtifactPatcher;
use crate::pipeline::{PipelineTask, StageReport, TaskResult};
use async_trait::async_trait;
use overlaykit_shared::{BuildError, PatchError};
use std::sync::Arc;

pub struct PatchTask {
    patcher: Arc<dyn ArtifactPatcher>,
    name: String,
}

impl PatchTask {
    pub fn new(patcher: Arc<dyn ArtifactPatcher>) -> Self {
        let name = format!("patch_{}", patcher.name());
        Self { patcher, name }
    }
}

#[async_trait]
impl PipelineTask<BuildCtx> for PatchTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> TaskResult {
        let task_name = self.name();
        task_start(&ctx, task_name);

        let runtime_root = ctx.layout.runtime_root();
        if !runtime_root.is_dir() {
            return Err(BuildError::Patch(PatchError::new(
                self.patcher.name(),
                format!("runtime root {} is not installed", runtime_root.display()),
            )));
        }

        self.patcher
            .patch(runtime_root)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        tracing::info!(task = task_name, "Artifact patched");
        Ok(StageReport::new(task_name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
