//! Error taxonomy for overlay builds and the dev loop.
//!
//! - [`StageError`]: one source entry failed to transform. Collected, never
//!   fatal on its own.
//! - [`BuildError`]: a pipeline run was aborted (aggregated stage failures,
//!   bundler, bootstrap or patch failure).
//! - [`PatchError`]: an artifact patch collaborator failed.
//! - [`ProcessError`]: host process launch/close failure, or the host went
//!   away without being asked to.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type OverlayResult<T> = Result<T, OverlayError>;

/// Top-level error for the overlaykit library.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("host process error: {0}")]
    Process(#[from] ProcessError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure transforming a single source entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageError {
    /// Name of the stage that produced the error.
    pub stage: String,
    /// Offending source path.
    pub path: PathBuf,
    pub message: String,
}

impl StageError {
    pub fn new(stage: impl Into<String>, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.path.display(), self.message)
    }
}

impl std::error::Error for StageError {}

/// Fatal failure of one pipeline run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// One or more stages reported per-entry failures.
    #[error("{} stage error(s): {}", .0.len(), join_stage_errors(.0))]
    Stages(Vec<StageError>),

    #[error("runtime bootstrap failed: {0}")]
    Bootstrap(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BuildError {
    /// Stage errors carried by this build error, empty for non-aggregate variants.
    pub fn stage_errors(&self) -> &[StageError] {
        match self {
            BuildError::Stages(errors) => errors,
            _ => &[],
        }
    }
}

fn join_stage_errors(errors: &[StageError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Artifact patch collaborator failure.
#[derive(Debug, Error)]
#[error("patching {} failed: {reason}", artifact.display())]
pub struct PatchError {
    pub artifact: PathBuf,
    pub reason: String,
}

impl PatchError {
    pub fn new(artifact: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

/// Host process lifecycle failures.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch host process: {0}")]
    Launch(String),

    #[error("failed to close host process: {0}")]
    Close(String),

    /// The host disconnected while no close had been requested.
    #[error("host process {pid} terminated unexpectedly ({status})")]
    UnintendedTermination { pid: u32, status: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_aggregate_display() {
        let err = BuildError::Stages(vec![
            StageError::new("modules", "src/modules/a.ts", "unexpected token"),
            StageError::new("modules", "src/modules/b.ts", "unterminated string"),
        ]);

        let text = err.to_string();
        assert!(text.starts_with("2 stage error(s)"));
        assert!(text.contains("a.ts: unexpected token"));
        assert!(text.contains("b.ts: unterminated string"));
        assert_eq!(err.stage_errors().len(), 2);
    }

    #[test]
    fn test_non_aggregate_has_no_stage_errors() {
        let err = BuildError::Bootstrap("archive missing".into());
        assert!(err.stage_errors().is_empty());
    }

    #[test]
    fn test_patch_error_converts_into_build_error() {
        let err: BuildError = PatchError::new("browser.xhtml", "no <head>").into();
        assert_eq!(err.to_string(), "patching browser.xhtml failed: no <head>");
    }
}
