//! Subprocess-backed host driver.
//!
//! Each launched process gets a supervisor task that owns the `Child`:
//!
//! ```text
//! child exits on its own   ─┐
//!                           ├─→ publish HostExit on the watch channel
//! close() requested        ─┘   (after SIGTERM, grace period, SIGKILL)
//! ```

use super::spawn::spawn_host;
use super::{HostExit, HostHandle, HostLauncher, LaunchSpec};
use async_trait::async_trait;
use overlaykit_shared::ProcessError;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{oneshot, watch};

/// Launches the host executable as a child process.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    close_grace: Duration,
}

impl SubprocessLauncher {
    pub fn new(close_grace: Duration) -> Self {
        Self { close_grace }
    }
}

impl Default for SubprocessLauncher {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl HostLauncher for SubprocessLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn HostHandle>, ProcessError> {
        tokio::fs::create_dir_all(&spec.profile_dir).await.map_err(|e| {
            ProcessError::Launch(format!(
                "Failed to create profile directory {}: {}",
                spec.profile_dir.display(),
                e
            ))
        })?;

        let child = spawn_host(spec)?;
        let pid = child
            .id()
            .ok_or_else(|| ProcessError::Launch("host process exited during spawn".into()))?;

        tracing::info!(
            pid = pid,
            executable = %spec.executable.display(),
            profile = %spec.profile_dir.display(),
            "Host process launched"
        );

        let (exit_tx, exit_rx) = watch::channel(None);
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(supervise(child, pid, self.close_grace, close_rx, exit_tx));

        Ok(Box::new(SubprocessHandle {
            pid,
            exit_rx,
            close_tx: Some(close_tx),
        }))
    }
}

/// Handle to one supervised host process.
pub struct SubprocessHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<HostExit>>,
    close_tx: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl HostHandle for SubprocessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn disconnected(&self) -> watch::Receiver<Option<HostExit>> {
        self.exit_rx.clone()
    }

    async fn close(&mut self) -> Result<HostExit, ProcessError> {
        if let Some(close_tx) = self.close_tx.take() {
            // Err means the supervisor already finished; the exit is published.
            let _ = close_tx.send(());
        }

        let mut exit_rx = self.exit_rx.clone();
        let exit = exit_rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                ProcessError::Close(format!(
                    "supervisor for host process {} stopped without an exit status",
                    self.pid
                ))
            })?
            .clone();

        exit.ok_or_else(|| ProcessError::Close(format!("host process {} has no exit status", self.pid)))
    }
}

async fn supervise(
    mut child: Child,
    pid: u32,
    grace: Duration,
    close_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<HostExit>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // fires on close() and when the handle is dropped
        _ = close_rx => stop_child(&mut child, pid, grace).await,
    };

    let exit = HostExit::from_status(status);
    tracing::info!(pid = pid, status = %exit, "Host process exited");
    let _ = exit_tx.send(Some(exit));
}

/// SIGTERM, then SIGKILL once `grace` has elapsed.
async fn stop_child(
    child: &mut Child,
    pid: u32,
    grace: Duration,
) -> std::io::Result<std::process::ExitStatus> {
    tracing::debug!(pid = pid, grace_ms = grace.as_millis() as u64, "Stopping host process");

    #[cfg(unix)]
    {
        if !crate::util::process::terminate_process(pid) {
            tracing::warn!(pid = pid, "Failed to deliver SIGTERM to host process");
        }
    }
    #[cfg(not(unix))]
    {
        child.start_kill()?;
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(pid = pid, "Host process ignored SIGTERM, killing");
            child.kill().await?;
            child.wait().await
        }
    }
}
