//! Resolved filesystem layout for one project.

use crate::runtime::options::BuildOptions;
use overlaykit_shared::{OverlayError, OverlayResult};
use std::path::{Path, PathBuf};

/// Absolute paths derived from [`BuildOptions`].
///
/// Immutable after construction; cheap to clone into tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    project_root: PathBuf,
    source_root: PathBuf,
    public_dir: PathBuf,
    overlay_root: PathBuf,
    runtime_root: PathBuf,
    archive_path: PathBuf,
    marker_path: PathBuf,
    logs_dir: PathBuf,
    profile_dir: PathBuf,
    host_executable: PathBuf,
}

impl OutputLayout {
    pub fn new(options: &BuildOptions) -> Self {
        let root = &options.project_root;
        let runtime_root = root.join(&options.runtime_root);
        Self {
            project_root: root.clone(),
            source_root: root.join(&options.source_root),
            public_dir: root.join(&options.public_dir),
            overlay_root: root.join(&options.overlay_root),
            archive_path: root.join(&options.archive),
            marker_path: runtime_root.join(&options.marker_file),
            logs_dir: root.join(&options.logs_dir),
            profile_dir: root.join(&options.host.profile_dir),
            host_executable: runtime_root.join(&options.host.executable),
            runtime_root,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Root of the watched source tree.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn overlay_root(&self) -> &Path {
        &self.overlay_root
    }

    pub fn runtime_root(&self) -> &Path {
        &self.runtime_root
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn host_executable(&self) -> &Path {
        &self.host_executable
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.project_root.join(relative)
    }

    /// Create directories that must exist before anything logs or builds.
    pub fn prepare(&self) -> OverlayResult<()> {
        std::fs::create_dir_all(&self.logs_dir).map_err(|e| {
            OverlayError::Storage(format!(
                "Failed to create logs directory {}: {}",
                self.logs_dir.display(),
                e
            ))
        })
    }
}
