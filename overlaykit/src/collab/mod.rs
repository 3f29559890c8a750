//! External collaborators the build sequences but does not implement.
//!
//! Each concern is a narrow trait so orchestration never depends on a
//! concrete toolchain:
//!
//! - [`Transpiler`]: module source → code + source map
//! - [`StylePreprocessor`]: style source → css + optional source map
//! - [`Bundler`]: entry points → emitted file graph
//! - [`ArtifactPatcher`]: idempotent edit of one artifact in the runtime tree
//! - [`ArchiveUnpacker`]: packaged runtime archive → file tree
//!
//! Default implementations shell out to configured commands
//! ([`command`]), pass sources through unchanged ([`passthrough`]), or patch
//! text artifacts with marked lines ([`patch`]).

pub mod archive;
pub mod command;
pub mod passthrough;
pub mod patch;

pub use archive::{ArchiveFormat, ArchiveUnpacker, TarUnpacker};
pub use command::{CommandBundler, CommandPreprocessor, CommandTranspiler};
pub use passthrough::{NoopBundler, PassthroughPreprocessor, PassthroughTranspiler};
pub use patch::{DocumentPatcher, ManifestPatcher};

use crate::runtime::{BuildOptions, BundleEntry, OutputLayout};
use async_trait::async_trait;
use overlaykit_shared::PatchError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a collaborator for one request.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("invalid output from {program}: {reason}")]
    Protocol { program: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Source language dialect for the transpiler, taken from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDialect {
    TypeScript,
    EcmaScript,
}

impl SourceDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::EcmaScript => "ecmascript",
        }
    }
}

/// Per-file transpile options.
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Source file being transformed (for diagnostics and map sources).
    pub file_name: PathBuf,
    pub target: String,
    pub dialect: SourceDialect,
    pub decorators: bool,
    pub dynamic_import: bool,
    pub import_assertions: bool,
    pub source_maps: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOutput {
    pub code: String,
    pub source_map: Option<String>,
}

#[async_trait]
pub trait Transpiler: Send + Sync {
    async fn transform(
        &self,
        source: &str,
        options: &TranspileOptions,
    ) -> Result<TranspileOutput, CollabError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOutput {
    pub css: String,
    pub source_map: Option<String>,
}

#[async_trait]
pub trait StylePreprocessor: Send + Sync {
    /// Transform `source` read from `from`, destined for `to`.
    async fn process(&self, source: &str, from: &Path, to: &Path)
    -> Result<StyleOutput, CollabError>;
}

/// What the bundler is asked to produce.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Resolution root for module imports.
    pub root: PathBuf,
    /// Output directory (the overlay root).
    pub out_dir: PathBuf,
    /// Entry points, with paths resolved against the project root.
    pub entries: Vec<BundleEntry>,
    pub entry_file_names: String,
    pub assets_dir: PathBuf,
    pub sourcemap: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    /// Files the bundler wrote.
    pub emitted: Vec<PathBuf>,
}

#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, CollabError>;
}

/// Idempotent structural edit of one artifact inside the installed runtime.
#[async_trait]
pub trait ArtifactPatcher: Send + Sync {
    async fn patch(&self, installed_root: &Path) -> Result<(), PatchError>;

    fn name(&self) -> &str;
}

/// The full set of collaborators one build uses.
#[derive(Clone)]
pub struct Collaborators {
    pub bundler: Arc<dyn Bundler>,
    pub transpiler: Arc<dyn Transpiler>,
    pub preprocessor: Arc<dyn StylePreprocessor>,
    pub unpacker: Arc<dyn ArchiveUnpacker>,
    /// Applied in order after the runtime is installed.
    pub patchers: Vec<Arc<dyn ArtifactPatcher>>,
}

impl Collaborators {
    /// Defaults derived from build options.
    ///
    /// Configured commands become command collaborators; missing ones fall
    /// back to pass-through implementations.
    pub fn from_options(options: &BuildOptions) -> Self {
        let layout = OutputLayout::new(options);

        let bundler: Arc<dyn Bundler> = match &options.bundle.command {
            Some(command) => Arc::new(CommandBundler::new(command.clone(), layout.project_root())),
            None => Arc::new(NoopBundler),
        };
        let transpiler: Arc<dyn Transpiler> = match &options.transpile.command {
            Some(command) => Arc::new(CommandTranspiler::new(command.clone())),
            None => Arc::new(PassthroughTranspiler),
        };
        let preprocessor: Arc<dyn StylePreprocessor> = match &options.style_command {
            Some(command) => Arc::new(CommandPreprocessor::new(command.clone())),
            None => Arc::new(PassthroughPreprocessor),
        };

        Self {
            bundler,
            transpiler,
            preprocessor,
            unpacker: Arc::new(TarUnpacker),
            patchers: vec![
                Arc::new(ManifestPatcher::new(
                    options.patches.manifest.clone(),
                    options.patches.manifest_entries.clone(),
                )),
                Arc::new(DocumentPatcher::new(
                    options.patches.document.clone(),
                    options.patches.document_script.clone(),
                )),
            ],
        }
    }
}
