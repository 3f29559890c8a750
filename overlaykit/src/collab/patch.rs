//! Text patchers for artifacts inside the installed runtime.
//!
//! Both patchers own a marked region of their artifact. Each run removes the
//! previous region and writes a fresh one, so applying a patch twice leaves
//! the same bytes as applying it once.

use super::ArtifactPatcher;
use async_trait::async_trait;
use overlaykit_shared::PatchError;
use std::path::{Path, PathBuf};

const MANIFEST_BEGIN: &str = "# overlaykit:begin";
const MANIFEST_END: &str = "# overlaykit:end";

/// Attribute carried by every element the document patcher inserts.
pub const DOCUMENT_MARKER: &str = "data-overlaykit";

async fn read_artifact(artifact: &str, path: &Path) -> Result<String, PatchError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PatchError::new(artifact, format!("cannot read {}: {}", path.display(), e)))
}

async fn write_artifact(artifact: &str, path: &Path, contents: &str) -> Result<(), PatchError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PatchError::new(artifact, format!("cannot write {}: {}", path.display(), e)))
}

/// Registers the overlay's chrome packages in the host manifest.
#[derive(Debug, Clone)]
pub struct ManifestPatcher {
    /// Manifest path relative to the runtime root.
    manifest: PathBuf,
    entries: Vec<String>,
}

impl ManifestPatcher {
    pub fn new(manifest: PathBuf, entries: Vec<String>) -> Self {
        Self { manifest, entries }
    }

    fn apply(&self, original: &str) -> Result<String, PatchError> {
        let mut kept = Vec::new();
        let mut in_block = false;
        for line in original.lines() {
            match line.trim() {
                MANIFEST_BEGIN if !in_block => in_block = true,
                MANIFEST_END if in_block => in_block = false,
                _ if in_block => {}
                _ => kept.push(line),
            }
        }
        if in_block {
            return Err(PatchError::new(
                "manifest",
                format!("unterminated '{}' block", MANIFEST_BEGIN),
            ));
        }

        while kept.last().is_some_and(|line| line.trim().is_empty()) {
            kept.pop();
        }

        let mut patched = String::with_capacity(original.len() + 256);
        for line in kept {
            patched.push_str(line);
            patched.push('\n');
        }
        patched.push_str(MANIFEST_BEGIN);
        patched.push('\n');
        for entry in &self.entries {
            patched.push_str(entry);
            patched.push('\n');
        }
        patched.push_str(MANIFEST_END);
        patched.push('\n');
        Ok(patched)
    }
}

#[async_trait]
impl ArtifactPatcher for ManifestPatcher {
    async fn patch(&self, installed_root: &Path) -> Result<(), PatchError> {
        let path = installed_root.join(&self.manifest);
        let original = read_artifact(self.name(), &path).await?;
        let patched = self.apply(&original)?;
        if patched != original {
            write_artifact(self.name(), &path, &patched).await?;
        }
        tracing::debug!(path = %path.display(), entries = self.entries.len(), "Patched manifest");
        Ok(())
    }

    fn name(&self) -> &str {
        "manifest"
    }
}

/// Injects the overlay loader script into the host's main document.
#[derive(Debug, Clone)]
pub struct DocumentPatcher {
    /// Document path relative to the runtime root.
    document: PathBuf,
    script: String,
}

impl DocumentPatcher {
    pub fn new(document: PathBuf, script: String) -> Self {
        Self { document, script }
    }

    fn apply(&self, original: &str) -> Result<String, PatchError> {
        if self.script.contains("</script") {
            return Err(PatchError::new("document", "script body must not close its element"));
        }

        let mut patched = String::with_capacity(original.len() + self.script.len() + 64);
        let mut inserted = false;
        for line in original.split_inclusive('\n') {
            if line.contains(DOCUMENT_MARKER) {
                continue;
            }
            if !inserted && let Some(at) = line.find("</head>") {
                let (before, after) = line.split_at(at);
                let indent: String = before.chars().take_while(|c| c.is_whitespace()).collect();
                if !before.trim().is_empty() {
                    patched.push_str(before);
                    patched.push('\n');
                }
                patched.push_str(&indent);
                patched.push_str("  ");
                patched.push_str(&self.element());
                patched.push('\n');
                patched.push_str(&indent);
                patched.push_str(after);
                inserted = true;
                continue;
            }
            patched.push_str(line);
        }

        if !inserted {
            return Err(PatchError::new("document", "no </head> element found"));
        }
        Ok(patched)
    }

    fn element(&self) -> String {
        format!("<script {}=\"\">{}</script>", DOCUMENT_MARKER, self.script)
    }
}

#[async_trait]
impl ArtifactPatcher for DocumentPatcher {
    async fn patch(&self, installed_root: &Path) -> Result<(), PatchError> {
        let path = installed_root.join(&self.document);
        let original = read_artifact(self.name(), &path).await?;
        let patched = self.apply(&original)?;
        if patched != original {
            write_artifact(self.name(), &path, &patched).await?;
        }
        tracing::debug!(path = %path.display(), "Patched document");
        Ok(())
    }

    fn name(&self) -> &str {
        "document"
    }
}
