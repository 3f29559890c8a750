//! Generic table-driven pipeline execution framework.
//!
//! This module provides a reusable pipeline infrastructure that supports:
//! - Table-driven execution plans
//! - Parallel and sequential task execution modes
//! - Per-task reports that collect entry failures without aborting siblings
//!
//! ## Architecture
//!
//! ```text
//! Pipeline → Phases → Tasks
//!
//! - Pipeline: Orchestrates execution of all phases
//! - Phase: Groups related tasks with an execution mode (parallel/sequential)
//! - Task: Atomic unit of work, returns a StageReport
//! ```
//!
//! A phase whose reports carry any [`StageError`](overlaykit_shared::StageError)
//! ends the run: later phases never start.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineBuilder, PipelineExecutor, Phase};
//!
//! let plan = ExecutionPlan::new(vec![
//!     Phase::sequential(vec![Box::new(TaskA)]),
//!     Phase::parallel(vec![Box::new(TaskB), Box::new(TaskC)]),
//! ]);
//!
//! let pipeline = PipelineBuilder::from_plan(plan);
//! let outcome = PipelineExecutor::execute(pipeline, ctx).await?;
//! println!("pipeline took {}ms", outcome.metrics.total_duration_ms);
//! ```

mod metrics;
mod phase;
#[allow(clippy::module_inception)]
mod pipeline;
mod report;
mod task;

pub use metrics::{PhaseMetrics, PipelineMetrics, TaskMetrics};
pub use phase::{ExecutionMode, Phase};
pub use pipeline::{ExecutionPlan, Pipeline, PipelineBuilder, PipelineExecutor, PipelineOutcome};
pub use report::StageReport;
pub use task::{BoxedTask, PipelineTask, TaskResult};
