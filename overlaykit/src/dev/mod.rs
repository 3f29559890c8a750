//! Dev Loop Controller.
//!
//! Owns the single live host handle, the source watcher and the reentrancy
//! gate for one dev session:
//!
//! ```text
//! Idle → Building ─ ok ─→ launch host → Running ─┐
//!          │                                      │ change event (gate free)
//!          └─ err ─→ Idle, watcher armed          ▼
//!                                             Restarting:
//!                                               intended_close = true
//!                                               close host, wait for exit
//!                                               close watcher
//!                                               → Idle → Building ...
//! ```
//!
//! A host disconnect while `intended_close` is clear ends the session with
//! [`ProcessError::UnintendedTermination`].

pub mod state;
pub mod watcher;

pub use state::DevState;
pub use watcher::{
    ChangeEvent, ChangeGate, ChangeNotifier, NotifyOutcome, NotifyWatcher, SourceWatcher,
    WatchHandle,
};

use crate::build::OverlayBuilder;
use crate::host::{HostExit, HostHandle, HostLauncher, LaunchSpec};
use overlaykit_shared::{OverlayError, OverlayResult, ProcessError};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

enum Wake {
    Change(Option<ChangeEvent>),
    Disconnect(Option<HostExit>),
    Shutdown,
}

/// One dev session. Construct a fresh controller per session; nothing is
/// shared between instances.
pub struct DevLoop {
    builder: Arc<dyn OverlayBuilder>,
    launcher: Arc<dyn HostLauncher>,
    watcher: Arc<dyn SourceWatcher>,
    launch_spec: LaunchSpec,
    watch_root: PathBuf,
    host: Option<Box<dyn HostHandle>>,
    restarting: ChangeGate,
    intended_close: bool,
    state: watch::Sender<DevState>,
}

impl DevLoop {
    pub fn new(
        builder: Arc<dyn OverlayBuilder>,
        launcher: Arc<dyn HostLauncher>,
        watcher: Arc<dyn SourceWatcher>,
        launch_spec: LaunchSpec,
        watch_root: impl Into<PathBuf>,
    ) -> Self {
        let (state, _) = watch::channel(DevState::Idle);
        Self {
            builder,
            launcher,
            watcher,
            launch_spec,
            watch_root: watch_root.into(),
            host: None,
            restarting: ChangeGate::default(),
            intended_close: false,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<DevState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DevState {
        *self.state.borrow()
    }

    fn set_state(&self, state: DevState) {
        tracing::debug!(state = %state, "Dev loop state");
        self.state.send_replace(state);
    }

    /// Build, launch and relaunch on change until `shutdown` resolves or a
    /// fatal error occurs.
    ///
    /// Build failures are reported and leave the loop armed. Launch, close
    /// and watch failures, and unintended host termination, are fatal.
    pub async fn run_until<F>(&mut self, shutdown: F) -> OverlayResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let result = self.run_inner(shutdown).await;
        if result.is_err() {
            self.abandon_host().await;
            self.set_state(DevState::Idle);
        }
        result
    }

    async fn run_inner<F>(&mut self, shutdown: F) -> OverlayResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            self.build_and_launch().await?;

            // Restart cycle complete, successful or not.
            self.intended_close = false;
            self.restarting.release();

            let (notifier, mut changes) = ChangeNotifier::channel(self.restarting.clone());
            let watch = self.watcher.watch(&self.watch_root, notifier)?;
            let mut disconnected = self.host.as_ref().map(|host| host.disconnected());

            let wake = tokio::select! {
                biased;
                () = &mut shutdown => Wake::Shutdown,
                exit = wait_disconnect(&mut disconnected) => Wake::Disconnect(exit),
                change = changes.recv() => Wake::Change(change),
            };

            match wake {
                Wake::Change(Some(event)) => {
                    if !self.restarting.try_acquire() {
                        return Err(OverlayError::Internal("restart gate already held".into()));
                    }
                    self.set_state(DevState::Restarting);
                    tracing::info!(paths = ?event.paths, "Source changed, restarting host");
                    self.stop_host().await?;
                    watch.close();
                    self.set_state(DevState::Idle);
                }
                Wake::Change(None) => {
                    watch.close();
                    return Err(OverlayError::Internal("source watcher stopped".into()));
                }
                Wake::Disconnect(exit) => {
                    watch.close();
                    let pid = self.host.take().map(|host| host.pid()).unwrap_or_default();
                    self.on_disconnect(pid, exit)?;
                    self.set_state(DevState::Idle);
                }
                Wake::Shutdown => {
                    tracing::info!("Shutdown requested");
                    watch.close();
                    self.stop_host().await?;
                    self.set_state(DevState::Idle);
                    return Ok(());
                }
            }
        }
    }

    async fn build_and_launch(&mut self) -> OverlayResult<()> {
        self.set_state(DevState::Building);

        let builder = Arc::clone(&self.builder);
        if let Err(e) = builder.build_once().await {
            tracing::error!("Build failed, waiting for the next change: {}", e);
            for stage_error in e.stage_errors() {
                tracing::error!(
                    stage = %stage_error.stage,
                    path = %stage_error.path.display(),
                    "{}",
                    stage_error.message
                );
            }
            self.set_state(DevState::Idle);
            return Ok(());
        }

        let launcher = Arc::clone(&self.launcher);
        let host = launcher.launch(&self.launch_spec).await?;
        tracing::info!(pid = host.pid(), "Host running");
        self.host = Some(host);
        self.set_state(DevState::Running);
        Ok(())
    }

    /// Close the live host, if any, as an intended termination.
    async fn stop_host(&mut self) -> OverlayResult<()> {
        let Some(mut host) = self.host.take() else {
            return Ok(());
        };
        let pid = host.pid();

        self.intended_close = true;
        let exit = host.close().await?;
        self.on_disconnect(pid, Some(exit))
    }

    fn on_disconnect(&self, pid: u32, exit: Option<HostExit>) -> OverlayResult<()> {
        let status = exit
            .map(|exit| exit.description)
            .unwrap_or_else(|| "unknown status".to_string());

        if self.intended_close {
            tracing::info!(pid = pid, status = %status, "Host closed for restart");
            return Ok(());
        }

        tracing::error!(pid = pid, status = %status, "Host process terminated unexpectedly");
        Err(ProcessError::UnintendedTermination { pid, status }.into())
    }

    /// Best-effort close on the fatal path.
    async fn abandon_host(&mut self) {
        if let Some(mut host) = self.host.take() {
            self.intended_close = true;
            if let Err(e) = host.close().await {
                tracing::warn!(pid = host.pid(), "Failed to close host: {}", e);
            }
        }
    }
}

/// Resolves when the host disconnects; never resolves without a host.
async fn wait_disconnect(
    disconnected: &mut Option<watch::Receiver<Option<HostExit>>>,
) -> Option<HostExit> {
    match disconnected {
        Some(rx) => match rx.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone(),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
