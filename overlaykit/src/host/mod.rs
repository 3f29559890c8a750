//! Host process driver.
//!
//! ## Architecture
//!
//! - **HostLauncher**: spawning operation (creates a HostHandle)
//! - **HostHandle**: runtime operations on one live host process (close,
//!   disconnect signal, pid)
//!
//! The dev loop owns at most one handle at a time and closes it before
//! launching the next.

mod process;
mod spawn;

pub use process::{SubprocessHandle, SubprocessLauncher};

use crate::runtime::{HostOptions, OutputLayout};
use async_trait::async_trait;
use overlaykit_shared::ProcessError;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::watch;

/// Everything needed to start one host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable inside the installed runtime.
    pub executable: PathBuf,
    /// Dedicated profile directory, created before launch.
    pub profile_dir: PathBuf,
    /// Extra arguments after `--profile <dir>`.
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn new(layout: &OutputLayout, host: &HostOptions) -> Self {
        Self {
            executable: layout.host_executable().to_path_buf(),
            profile_dir: layout.profile_dir().to_path_buf(),
            args: host.args.clone(),
        }
    }
}

/// How a host process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostExit {
    /// Exit code, `None` when terminated by a signal or when waiting failed.
    pub code: Option<i32>,
    pub description: String,
}

impl HostExit {
    pub fn from_status(status: std::io::Result<std::process::ExitStatus>) -> Self {
        match status {
            Ok(status) => Self {
                code: status.code(),
                description: status.to_string(),
            },
            Err(e) => Self {
                code: None,
                description: format!("wait failed: {}", e),
            },
        }
    }
}

impl fmt::Display for HostExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Runtime operations on one launched host process.
#[async_trait]
pub trait HostHandle: Send {
    fn pid(&self) -> u32;

    /// Disconnect signal.
    ///
    /// The value turns `Some` exactly once, when the process has exited for
    /// any reason. A closed channel with `None` means the supervisor is gone
    /// and is treated as a disconnect with unknown status.
    fn disconnected(&self) -> watch::Receiver<Option<HostExit>>;

    /// Ask the process to exit and wait until it has.
    async fn close(&mut self) -> Result<HostExit, ProcessError>;
}

/// Trait for starting host processes.
#[async_trait]
pub trait HostLauncher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn HostHandle>, ProcessError>;
}
