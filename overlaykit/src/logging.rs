//! Tracing setup for the CLI.
//!
//! Two sinks share one `EnvFilter` (`RUST_LOG`, default `info`):
//! human-readable stderr and a plain-text file at
//! `<logs_dir>/overlaykit.log`.

use crate::runtime::OutputLayout;
use overlaykit_shared::{OverlayError, OverlayResult};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_FILE: &str = "overlaykit.log";

/// Keeps the file writer flushing until process exit.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(layout: &OutputLayout) -> OverlayResult<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        OverlayError::Storage(format!(
            "Failed to create logs directory {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let appender = tracing_appender::rolling::never(logs_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init();

    match result {
        Ok(()) => {
            let _ = FILE_GUARD.set(guard);
            Ok(())
        }
        // Another subscriber is already global, e.g. in tests.
        Err(e) => {
            tracing::debug!("Logging already initialized: {}", e);
            Ok(())
        }
    }
}
