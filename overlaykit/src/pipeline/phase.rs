//! Phase definition for table-driven pipeline execution.

/// Execution mode for a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Execute tasks concurrently and await all of them
    Parallel,
    /// Execute tasks one after another
    Sequential,
}

/// A phase contains multiple tasks and an execution mode.
///
/// Phases are executed in order, and each phase's tasks are executed
/// according to the phase's execution mode (parallel or sequential).
///
/// Generic over task type T to allow different pipeline implementations.
#[derive(Debug, Clone)]
pub struct Phase<T> {
    pub tasks: Vec<T>,
    pub execution: ExecutionMode,
}

impl<T> Phase<T> {
    /// Create a phase with parallel task execution.
    pub fn parallel(tasks: Vec<T>) -> Self {
        Self {
            tasks,
            execution: ExecutionMode::Parallel,
        }
    }

    /// Create a phase with sequential task execution.
    pub fn sequential(tasks: Vec<T>) -> Self {
        Self {
            tasks,
            execution: ExecutionMode::Sequential,
        }
    }
}
