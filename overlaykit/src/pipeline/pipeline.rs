//! Generic pipeline execution framework.
//!
//! Provides a table-driven pipeline executor that can run phases containing
//! tasks in parallel or sequential mode.

use super::metrics::{PhaseMetrics, PipelineMetrics, TaskMetrics};
use super::phase::{ExecutionMode, Phase};
use super::report::StageReport;
use super::task::{BoxedTask, TaskResult};
use futures::future::join_all;
use overlaykit_shared::{BuildError, StageError};
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    phases: Vec<Phase<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(phases: Vec<Phase<BoxedTask<Ctx>>>) -> Self {
        Self { phases }
    }

    pub fn phases(self) -> Vec<Phase<BoxedTask<Ctx>>> {
        self.phases
    }
}

pub struct Pipeline<Ctx> {
    phases: Vec<Phase<BoxedTask<Ctx>>>,
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new(phases: Vec<Phase<BoxedTask<Ctx>>>) -> Self {
        Self { phases }
    }
}

pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn from_plan<Ctx>(plan: ExecutionPlan<Ctx>) -> Pipeline<Ctx> {
        Pipeline::new(plan.phases())
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub metrics: PipelineMetrics,
    pub reports: Vec<StageReport>,
}

impl PipelineOutcome {
    pub fn written_count(&self) -> usize {
        self.reports.iter().map(|report| report.written.len()).sum()
    }
}

/// Pipeline executor framework.
///
/// This provides the generic infrastructure for executing a table-driven pipeline.
/// The actual task execution logic is provided by task implementations.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a pipeline.
    ///
    /// Iterates through phases and executes their tasks according to the
    /// phase's execution mode. Parallel tasks always all run to completion,
    /// so one failing sibling never cancels another.
    ///
    /// The run stops after the first phase that either returned a fatal
    /// error or collected any stage errors; in the latter case every stage
    /// error from that phase is returned as [`BuildError::Stages`].
    pub async fn execute<Ctx>(pipeline: Pipeline<Ctx>, ctx: Ctx) -> Result<PipelineOutcome, BuildError>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut phase_metrics = Vec::new();
        let mut reports = Vec::new();

        for (index, phase) in pipeline.phases.into_iter().enumerate() {
            let execution = phase.execution;
            let phase_start = Instant::now();

            tracing::debug!(phase = index, execution = ?execution, tasks = phase.tasks.len(), "Starting phase");

            let results = match execution {
                ExecutionMode::Parallel => {
                    let futures = phase.tasks.into_iter().map(|task| {
                        let ctx = ctx.clone();
                        async move { timed(task, ctx).await }
                    });
                    join_all(futures).await
                }
                ExecutionMode::Sequential => {
                    let mut results = Vec::new();
                    for task in phase.tasks {
                        let result = timed(task, ctx.clone()).await;
                        let stop = match &result.1 {
                            Ok(report) => !report.is_clean(),
                            Err(_) => true,
                        };
                        results.push(result);
                        if stop {
                            break;
                        }
                    }
                    results
                }
            };

            let mut task_metrics = Vec::with_capacity(results.len());
            let mut stage_errors: Vec<StageError> = Vec::new();
            let mut fatal: Option<BuildError> = None;

            for (metrics, result) in results {
                task_metrics.push(metrics);
                match result {
                    Ok(report) => {
                        stage_errors.extend(report.errors.iter().cloned());
                        reports.push(report);
                    }
                    Err(err) => {
                        tracing::error!(phase = index, "Task failed: {}", err);
                        // Keep the first fatal error; siblings already finished.
                        fatal.get_or_insert(err);
                    }
                }
            }

            phase_metrics.push(PhaseMetrics {
                index,
                execution,
                duration_ms: phase_start.elapsed().as_millis(),
                tasks: task_metrics,
            });

            if let Some(err) = fatal {
                return Err(err);
            }
            if !stage_errors.is_empty() {
                return Err(BuildError::Stages(stage_errors));
            }
        }

        Ok(PipelineOutcome {
            metrics: PipelineMetrics {
                total_duration_ms: total_start.elapsed().as_millis(),
                phases: phase_metrics,
            },
            reports,
        })
    }
}

async fn timed<Ctx>(task: BoxedTask<Ctx>, ctx: Ctx) -> (TaskMetrics, TaskResult) {
    let name = task.name().to_string();
    let task_start = Instant::now();
    let result = task.run(ctx).await;
    let written = result.as_ref().map(|report| report.written.len()).unwrap_or(0);
    (
        TaskMetrics {
            name,
            duration_ms: task_start.elapsed().as_millis(),
            written,
        },
        result,
    )
}
