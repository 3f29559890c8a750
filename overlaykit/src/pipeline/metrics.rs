use crate::pipeline::ExecutionMode;

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
    pub written: usize,
}

#[derive(Debug, Clone)]
pub struct PhaseMetrics {
    pub index: usize,
    pub execution: ExecutionMode,
    pub duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub phases: Vec<PhaseMetrics>,
}

impl PipelineMetrics {
    pub fn task_duration_ms(&self, name: &str) -> Option<u128> {
        self.task(name).map(|task| task.duration_ms)
    }

    pub fn task(&self, name: &str) -> Option<&TaskMetrics> {
        self.phases
            .iter()
            .flat_map(|phase| phase.tasks.iter())
            .find(|task| task.name == name)
    }

    pub fn log_summary(&self) {
        for phase in &self.phases {
            for task in &phase.tasks {
                tracing::info!(
                    phase = phase.index,
                    execution = ?phase.execution,
                    task = %task.name,
                    duration_ms = task.duration_ms as u64,
                    written = task.written,
                    "Task complete"
                );
            }
        }
        tracing::info!(
            total_duration_ms = self.total_duration_ms as u64,
            "Pipeline complete"
        );
    }
}
