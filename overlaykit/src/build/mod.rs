//! Pipeline Orchestrator.
//!
//! ## Architecture
//!
//! One build is a fixed table of phases:
//!
//! ```text
//!   1. Bundle                  (clean overlay root, bundle entries, copy public/)
//!   2. Style            ─┬─    (preprocess styles, copy static files)
//!      ModuleCopy(A)     ├─    (transpile module subtree A)
//!      ModuleCopy(B)    ─┘     (transpile module subtree B)
//!   3. RuntimeBootstrap        (install host runtime for the version tag)
//!   4. Patch(manifest)         (register overlay packages)
//!      Patch(document)         (inject loader script)
//! ```
//!
//! Any stage error in phase 1 or 2 aborts the run with every collected
//! error; bootstrap and patch failures abort it immediately.

pub mod context;
pub mod mapping;
pub mod source;
pub mod stages;

pub use context::{BuildContext, BuildCtx};
pub use mapping::{OutputMapping, PlannedEntry};
pub use source::{EntryKind, SourceEntry};

use crate::collab::Collaborators;
use crate::pipeline::{
    BoxedTask, ExecutionPlan, Phase, PipelineBuilder, PipelineExecutor, PipelineMetrics,
    StageReport,
};
use crate::runtime::{BuildOptions, OutputLayout};
use async_trait::async_trait;
use overlaykit_shared::{BuildError, OverlayResult};
use stages::{BundleTask, ModuleCopyTask, PatchTask, RuntimeBootstrapTask, StyleTask};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub version: String,
    pub metrics: PipelineMetrics,
    pub reports: Vec<StageReport>,
}

impl BuildSummary {
    pub fn report(&self, stage: &str) -> Option<&StageReport> {
        self.reports.iter().find(|report| report.stage == stage)
    }

    /// Every path written by the run, sorted.
    pub fn written(&self) -> Vec<PathBuf> {
        let mut written: Vec<PathBuf> = self
            .reports
            .iter()
            .flat_map(|report| report.written.iter().cloned())
            .collect();
        written.sort();
        written
    }
}

/// Anything that can perform one full build. The dev loop depends on this
/// seam rather than on [`BuildOrchestrator`] directly.
#[async_trait]
pub trait OverlayBuilder: Send + Sync {
    async fn build_once(&self) -> Result<BuildSummary, BuildError>;
}

fn get_execution_plan(options: &BuildOptions, collaborators: &Collaborators) -> ExecutionPlan<BuildCtx> {
    let mut transforms: Vec<BoxedTask<BuildCtx>> = vec![Box::new(StyleTask::new(options.style.clone()))];
    transforms.extend(
        options
            .modules
            .iter()
            .cloned()
            .map(|rule| Box::new(ModuleCopyTask::new(rule)) as BoxedTask<BuildCtx>),
    );

    let patches: Vec<BoxedTask<BuildCtx>> = collaborators
        .patchers
        .iter()
        .map(|patcher| Box::new(PatchTask::new(Arc::clone(patcher))) as BoxedTask<BuildCtx>)
        .collect();

    let mut phases = vec![
        // Phase 1: bundle must finish before anything else writes
        Phase::sequential(vec![Box::new(BundleTask) as BoxedTask<BuildCtx>]),
        // Phase 2: disjoint output subtrees, safe to run together
        Phase::parallel(transforms),
        // Phase 3: runtime tree must be consistent before patching
        Phase::sequential(vec![Box::new(RuntimeBootstrapTask) as BoxedTask<BuildCtx>]),
    ];
    if !patches.is_empty() {
        // Phase 4: fixed order
        phases.push(Phase::sequential(patches));
    }

    ExecutionPlan::new(phases)
}

/// Sequences the build stages, the runtime bootstrap and the artifact
/// patches for one project.
pub struct BuildOrchestrator {
    ctx: BuildCtx,
}

impl BuildOrchestrator {
    pub fn new(options: BuildOptions, collaborators: Collaborators) -> OverlayResult<Self> {
        options.validate()?;
        Ok(Self {
            ctx: Arc::new(BuildContext::new(options, collaborators)),
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.ctx.layout
    }

    pub fn options(&self) -> &BuildOptions {
        &self.ctx.options
    }

    /// Run the whole pipeline once against the current source tree.
    pub async fn build_once(&self) -> Result<BuildSummary, BuildError> {
        let version = self.ctx.options.version.clone();
        tracing::info!(
            version = %version,
            project = %self.ctx.layout.project_root().display(),
            "Build started"
        );

        let plan = get_execution_plan(&self.ctx.options, &self.ctx.collaborators);
        let pipeline = PipelineBuilder::from_plan(plan);
        let outcome = PipelineExecutor::execute(pipeline, Arc::clone(&self.ctx))
            .await
            .inspect_err(|e| tracing::error!(version = %version, "Build failed: {}", e))?;

        outcome.metrics.log_summary();
        tracing::info!(
            version = %version,
            written = outcome.written_count(),
            "Build complete"
        );

        Ok(BuildSummary {
            version,
            metrics: outcome.metrics,
            reports: outcome.reports,
        })
    }
}

#[async_trait]
impl OverlayBuilder for BuildOrchestrator {
    async fn build_once(&self) -> Result<BuildSummary, BuildError> {
        BuildOrchestrator::build_once(self).await
    }
}
