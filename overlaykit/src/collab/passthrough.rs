//! Collaborators used when no external tool is configured.

use super::{
    BundleOutput, BundleRequest, Bundler, CollabError, StyleOutput, StylePreprocessor,
    TranspileOptions, TranspileOutput, Transpiler,
};
use async_trait::async_trait;
use std::path::Path;

/// Returns the source unchanged, without a source map.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranspiler;

#[async_trait]
impl Transpiler for PassthroughTranspiler {
    async fn transform(
        &self,
        source: &str,
        _options: &TranspileOptions,
    ) -> Result<TranspileOutput, CollabError> {
        Ok(TranspileOutput {
            code: source.to_string(),
            source_map: None,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughPreprocessor;

#[async_trait]
impl StylePreprocessor for PassthroughPreprocessor {
    async fn process(
        &self,
        source: &str,
        _from: &Path,
        _to: &Path,
    ) -> Result<StyleOutput, CollabError> {
        Ok(StyleOutput {
            css: source.to_string(),
            source_map: None,
        })
    }
}

/// Emits nothing. The bundle stage still cleans the overlay root and copies
/// the public directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBundler;

#[async_trait]
impl Bundler for NoopBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, CollabError> {
        tracing::warn!(
            entries = request.entries.len(),
            "No bundler configured, skipping entry bundling"
        );
        Ok(BundleOutput::default())
    }
}
