//! Host runtime installation.
//!
//! The runtime root holds exactly one installed version. A marker file inside
//! it records the version tag; when the marker is absent or names another
//! version the whole root is replaced from the packaged archive.
//!
//! ```text
//! marker == version  →  AlreadyInstalled (no-op)
//! otherwise          →  delete runtime root
//!                       unpack archive into a staging dir next to it
//!                       rename staging dir → runtime root
//!                       write marker          →  InstalledNow
//! ```
//!
//! The marker is written last, so an interrupted install is redone on the
//! next run.

use crate::collab::ArchiveUnpacker;
use crate::runtime::OutputLayout;
use overlaykit_shared::{OverlayError, OverlayResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of [`RuntimeInstaller::ensure_runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled,
    InstalledNow,
}

/// Installs the packaged host runtime at most once per version.
///
/// The only component that deletes the runtime root.
#[derive(Clone)]
pub struct RuntimeInstaller {
    archive: PathBuf,
    runtime_root: PathBuf,
    marker: PathBuf,
    unpacker: Arc<dyn ArchiveUnpacker>,
}

impl RuntimeInstaller {
    pub fn new(layout: &OutputLayout, unpacker: Arc<dyn ArchiveUnpacker>) -> Self {
        Self {
            archive: layout.archive_path().to_path_buf(),
            runtime_root: layout.runtime_root().to_path_buf(),
            marker: layout.marker_path().to_path_buf(),
            unpacker,
        }
    }

    pub fn runtime_root(&self) -> &Path {
        &self.runtime_root
    }

    /// Version tag currently recorded in the marker, if any.
    pub async fn installed_version(&self) -> Option<String> {
        tokio::fs::read_to_string(&self.marker)
            .await
            .ok()
            .map(|raw| raw.trim_end().to_string())
    }

    /// Ensure `version` is the installed runtime.
    pub async fn ensure_runtime(&self, version: &str) -> OverlayResult<InstallOutcome> {
        let installed = self.installed_version().await;
        if installed.as_deref() == Some(version) {
            tracing::debug!(version = %version, "Host runtime already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        tracing::info!(
            version = %version,
            previous = ?installed,
            archive = %self.archive.display(),
            "Installing host runtime"
        );

        if !self.archive.is_file() {
            return Err(OverlayError::Storage(format!(
                "Runtime archive not found: {}",
                self.archive.display()
            )));
        }

        if tokio::fs::try_exists(&self.runtime_root).await? {
            tokio::fs::remove_dir_all(&self.runtime_root).await.map_err(|e| {
                OverlayError::Storage(format!(
                    "Failed to remove previous runtime {}: {}",
                    self.runtime_root.display(),
                    e
                ))
            })?;
        }

        let parent = self
            .runtime_root
            .parent()
            .ok_or_else(|| {
                OverlayError::Config(format!(
                    "Runtime root has no parent directory: {}",
                    self.runtime_root.display()
                ))
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        // Staging lives next to the runtime root so the final rename stays on
        // one filesystem.
        let staging = tempfile::Builder::new()
            .prefix(".runtime-staging-")
            .tempdir_in(&parent)
            .map_err(|e| {
                OverlayError::Storage(format!(
                    "Failed to create staging directory in {}: {}",
                    parent.display(),
                    e
                ))
            })?;

        let unpacker = Arc::clone(&self.unpacker);
        let archive = self.archive.clone();
        let staging_path = staging.path().to_path_buf();
        tokio::task::spawn_blocking(move || unpacker.unpack(&archive, &staging_path))
            .await
            .map_err(|e| OverlayError::Internal(format!("Unpack task failed: {}", e)))??;

        tokio::fs::rename(staging.path(), &self.runtime_root)
            .await
            .map_err(|e| {
                OverlayError::Storage(format!(
                    "Failed to move staged runtime into {}: {}",
                    self.runtime_root.display(),
                    e
                ))
            })?;
        // Staging dir was renamed away; drop only has an empty path left.
        drop(staging);

        tokio::fs::write(&self.marker, version).await.map_err(|e| {
            OverlayError::Storage(format!(
                "Failed to write runtime marker {}: {}",
                self.marker.display(),
                e
            ))
        })?;

        tracing::info!(version = %version, root = %self.runtime_root.display(), "Host runtime installed");
        Ok(InstallOutcome::InstalledNow)
    }
}
