//! Build tasks.
//!
//! Transform stages collect per-entry failures into their [`StageReport`];
//! bootstrap and patch tasks fail the run directly.

mod bootstrap;
mod bundle;
mod module_copy;
mod patch;
mod style;

pub use bootstrap::RuntimeBootstrapTask;
pub use bundle::BundleTask;
pub use module_copy::ModuleCopyTask;
pub use patch::PatchTask;
pub use style::StyleTask;

use crate::build::context::BuildCtx;

use crate::pipeline::StageReport;
use std::io;
use std::path::Path;

fn task_start(ctx: &BuildCtx, task_name: &str) {
    tracing::debug!(
        task = task_name,
        project = %ctx.layout.project_root().display(),
        "Task started"
    );
}

fn log_task_error(task_name: &str, error: &impl std::fmt::Display) {
    tracing::error!(task = task_name, "Task failed: {}", error);
}

/// Write `contents` to `path`, creating parent directories.
async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

/// Copy `source` byte-for-byte to `output`, creating parent directories.
async fn copy_output(source: &Path, output: &Path) -> io::Result<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, output).await.map(|_| ())
}

/// Best-effort removal of a partially written output.
async fn remove_stale(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), "Failed to remove stale output: {}", e);
    }
}

fn finish(task_name: &str, mut report: StageReport) -> StageReport {
    report.normalize();
    tracing::info!(
        stage = task_name,
        written = report.written.len(),
        errors = report.errors.len(),
        "Stage finished"
    );
    report
}
