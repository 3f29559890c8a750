//! Source entry discovery.

use crate::collab::SourceDialect;
use overlaykit_shared::{OverlayError, OverlayResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How a stage treats one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Module(SourceDialect),
    Style,
    Static,
}

impl EntryKind {
    /// Classify by final extension.
    pub fn classify(relative: &Path) -> Self {
        let ext = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match ext {
            "ts" | "mts" | "cts" | "tsx" => Self::Module(SourceDialect::TypeScript),
            "js" | "mjs" | "cjs" | "jsx" => Self::Module(SourceDialect::EcmaScript),
            "pcss" => Self::Style,
            _ => Self::Static,
        }
    }
}

/// A file under a source subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the subtree root.
    pub relative: PathBuf,
    pub kind: EntryKind,
}

impl SourceEntry {
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        let relative = relative.into();
        let kind = EntryKind::classify(&relative);
        Self { relative, kind }
    }
}

/// List every file under `root`, sorted by relative path.
///
/// A missing root yields no entries.
pub fn discover(root: &Path) -> OverlayResult<Vec<SourceEntry>> {
    if !root.exists() {
        tracing::debug!(root = %root.display(), "Source subtree missing, nothing to discover");
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let item = item.map_err(|e| {
            OverlayError::Storage(format!("Failed to walk {}: {}", root.display(), e))
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let relative = item
            .path()
            .strip_prefix(root)
            .map_err(|e| OverlayError::Internal(format!("walk escaped its root: {}", e)))?;
        entries.push(SourceEntry::new(relative));
    }

    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}
