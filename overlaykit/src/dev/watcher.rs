//! Source tree watching with a single-slot change queue.
//!
//! Watch callbacks never run rebuild logic themselves. They push into a
//! channel of capacity one:
//!
//! - gate held (restart in progress): the event is dropped
//! - slot empty: the event is queued
//! - slot full: the event is coalesced into the pending one
//!
//! Every rebuild reads the whole tree, so one pending signal is enough.

use overlaykit_shared::{OverlayError, OverlayResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Something under the watched root changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    pub paths: Vec<PathBuf>,
}

/// Reentrancy flag, held for the whole rebuild-and-relaunch cycle.
#[derive(Debug, Clone, Default)]
pub struct ChangeGate {
    held: Arc<AtomicBool>,
}

impl ChangeGate {
    /// Returns `false` if a cycle already holds the gate.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Queued,
    Coalesced,
    /// Gate held; a restart is already in progress.
    Dropped,
    /// Receiver gone; the loop has shut down.
    Closed,
}

/// Sending side handed to a [`SourceWatcher`].
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<ChangeEvent>,
    gate: ChangeGate,
}

impl ChangeNotifier {
    pub fn channel(gate: ChangeGate) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx, gate }, rx)
    }

    /// Non-blocking; safe to call from watcher threads.
    pub fn notify(&self, event: ChangeEvent) -> NotifyOutcome {
        if self.gate.is_held() {
            return NotifyOutcome::Dropped;
        }
        match self.tx.try_send(event) {
            Ok(()) => NotifyOutcome::Queued,
            Err(TrySendError::Full(_)) => NotifyOutcome::Coalesced,
            Err(TrySendError::Closed(_)) => NotifyOutcome::Closed,
        }
    }
}

/// An armed watch; dropping or closing it stops event delivery.
pub trait WatchHandle: Send {
    fn close(self: Box<Self>);
}

/// Trait for arming file watches.
pub trait SourceWatcher: Send + Sync {
    fn watch(&self, root: &Path, notifier: ChangeNotifier) -> OverlayResult<Box<dyn WatchHandle>>;
}

/// Recursive watcher on the platform's native backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyWatcher;

struct NotifyWatchHandle {
    _watcher: notify::RecommendedWatcher,
}

impl WatchHandle for NotifyWatchHandle {
    fn close(self: Box<Self>) {
        tracing::debug!("Source watcher closed");
    }
}

impl SourceWatcher for NotifyWatcher {
    fn watch(&self, root: &Path, notifier: ChangeNotifier) -> OverlayResult<Box<dyn WatchHandle>> {
        use notify::{EventKind, RecursiveMode, Watcher};

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    let outcome = notifier.notify(ChangeEvent { paths: event.paths });
                    tracing::trace!(outcome = ?outcome, "Source change");
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            })
            .map_err(|e| OverlayError::Internal(format!("Failed to create watcher: {}", e)))?;

        watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
            OverlayError::Storage(format!("Failed to watch {}: {}", root.display(), e))
        })?;

        tracing::debug!(root = %root.display(), "Source watcher armed");
        Ok(Box::new(NotifyWatchHandle { _watcher: watcher }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(name: &str) -> ChangeEvent {
        ChangeEvent {
            paths: vec![PathBuf::from(name)],
        }
    }

    #[test]
    fn test_gate_is_exclusive() {
        let gate = ChangeGate::default();
        assert!(gate.try_acquire());
        assert!(!gate.clone().try_acquire());
        gate.release();
        assert!(!gate.is_held());
        assert!(gate.try_acquire());
    }

    #[tokio::test]
    async fn test_burst_coalesces_into_one_pending_event() {
        let (notifier, mut rx) = ChangeNotifier::channel(ChangeGate::default());

        assert_eq!(notifier.notify(event("a.ts")), NotifyOutcome::Queued);
        assert_eq!(notifier.notify(event("b.ts")), NotifyOutcome::Coalesced);
        assert_eq!(notifier.notify(event("c.ts")), NotifyOutcome::Coalesced);

        assert_eq!(rx.recv().await.unwrap(), event("a.ts"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_events_dropped_while_gate_held() {
        let gate = ChangeGate::default();
        let (notifier, mut rx) = ChangeNotifier::channel(gate.clone());

        assert!(gate.try_acquire());
        assert_eq!(notifier.notify(event("a.ts")), NotifyOutcome::Dropped);
        gate.release();

        assert!(rx.try_recv().is_err());
        assert_eq!(notifier.notify(event("b.ts")), NotifyOutcome::Queued);
    }

    #[test]
    fn test_closed_receiver_reported() {
        let (notifier, rx) = ChangeNotifier::channel(ChangeGate::default());
        drop(rx);
        assert_eq!(notifier.notify(event("a.ts")), NotifyOutcome::Closed);
    }

    #[tokio::test]
    async fn test_notify_watcher_sees_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let (notifier, mut rx) = ChangeNotifier::channel(ChangeGate::default());
        let handle = NotifyWatcher.watch(dir.path(), notifier).unwrap();

        std::fs::write(dir.path().join("a.ts"), "export {};").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(matches!(received, Ok(Some(_))));
        handle.close();
    }
}
