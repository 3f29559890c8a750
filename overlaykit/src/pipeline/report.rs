//! Per-stage result bookkeeping.

use overlaykit_shared::StageError;
use std::path::PathBuf;

/// What one stage wrote, and which of its entries failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    pub written: Vec<PathBuf>,
    pub errors: Vec<StageError>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            written: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_written(&mut self, path: impl Into<PathBuf>) {
        self.written.push(path.into());
    }

    /// Record a failure for `path`, tagged with this report's stage name.
    pub fn record_error(&mut self, path: impl Into<PathBuf>, message: impl Into<String>) {
        let error = StageError::new(self.stage.clone(), path, message);
        tracing::warn!(stage = %error.stage, path = %error.path.display(), "{}", error.message);
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another report's entries into this one.
    pub fn absorb(&mut self, other: StageReport) {
        self.written.extend(other.written);
        self.errors.extend(other.errors);
    }

    /// Sort written paths and errors so reports compare equal across runs.
    pub fn normalize(&mut self) {
        self.written.sort();
        self.errors.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_tags_stage() {
        let mut report = StageReport::new("skin");
        report.record_error("src/skin/broken.pcss", "unclosed block");

        assert!(!report.is_clean());
        assert_eq!(report.errors[0].stage, "skin");
        assert_eq!(report.errors[0].path, PathBuf::from("src/skin/broken.pcss"));
    }

    #[test]
    fn test_normalize_orders_entries() {
        let mut report = StageReport::new("modules");
        report.record_written("out/b.js");
        report.record_written("out/a.js");
        report.record_error("src/z.ts", "bad");
        report.record_error("src/m.ts", "bad");

        report.normalize();

        assert_eq!(report.written, vec![PathBuf::from("out/a.js"), PathBuf::from("out/b.js")]);
        assert_eq!(report.errors[0].path, PathBuf::from("src/m.ts"));
    }
}
