//! Build options.
//!
//! Loaded from `overlaykit.json` in the project root when present; every
//! field has a default matching the stock project layout, so a partial file
//! only needs to name what differs.

use overlaykit_shared::{OverlayError, OverlayResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the optional options file in the project root.
pub const OPTIONS_FILE: &str = "overlaykit.json";

/// Environment variable overriding [`BuildOptions::version`].
pub const VERSION_ENV: &str = "OVERLAYKIT_VERSION";

/// An external program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Rewrite of a final file extension, e.g. `ts` → `js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRewrite {
    pub from: String,
    pub to: String,
}

impl ExtensionRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One source subtree and where its entries land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeRule {
    /// Stage name used in logs and errors.
    pub name: String,
    /// Source subtree, relative to the project root.
    pub source: PathBuf,
    /// Output subtree, relative to the project root.
    pub output: PathBuf,
    #[serde(default)]
    pub rewrites: Vec<ExtensionRewrite>,
}

/// Named bundle entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
    /// Entry file, relative to the project root.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    pub entries: Vec<BundleEntry>,
    /// Output file name pattern; `[name]` is replaced by the entry name.
    pub entry_file_names: String,
    /// Emitted asset directory, relative to the overlay root.
    pub assets_dir: PathBuf,
    pub sourcemap: bool,
    /// Bundler command. Without one the bundle stage only cleans the overlay
    /// root and copies the public directory.
    pub command: Option<CommandSpec>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            entries: vec![
                BundleEntry {
                    name: "index".into(),
                    path: "src/content/index.ts".into(),
                },
                BundleEntry {
                    name: "webpanel-index".into(),
                    path: "src/content/webpanel/index.html".into(),
                },
            ],
            entry_file_names: "content/[name].js".into(),
            assets_dir: "content/assets".into(),
            sourcemap: true,
            command: None,
        }
    }
}

/// Settings handed to the transpiler for every module entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileSettings {
    /// Target syntax level.
    pub target: String,
    pub decorators: bool,
    pub dynamic_import: bool,
    pub import_assertions: bool,
    pub source_maps: bool,
    /// Transpiler command. Without one modules are copied through unchanged.
    pub command: Option<CommandSpec>,
}

impl Default for TranspileSettings {
    fn default() -> Self {
        Self {
            target: "esnext".into(),
            decorators: true,
            dynamic_import: true,
            import_assertions: true,
            source_maps: true,
            command: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Host executable, relative to the runtime root.
    pub executable: PathBuf,
    /// Dedicated profile directory, relative to the project root.
    pub profile_dir: PathBuf,
    /// Extra arguments after `--profile <dir>`.
    pub args: Vec<String>,
    /// How long `close()` waits after SIGTERM before killing.
    pub close_grace_ms: u64,
}

impl Default for HostOptions {
    fn default() -> Self {
        let executable = if cfg!(windows) { "firefox.exe" } else { "firefox" };
        Self {
            executable: executable.into(),
            profile_dir: "dist/profile/test".into(),
            args: Vec::new(),
            close_grace_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchOptions {
    /// Chrome manifest, relative to the runtime root.
    pub manifest: PathBuf,
    /// Registration lines appended to the manifest.
    pub manifest_entries: Vec<String>,
    /// Browser document, relative to the runtime root.
    pub document: PathBuf,
    /// Body of the script element inserted into the document head.
    pub document_script: String,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            manifest: "browser/chrome.manifest".into(),
            manifest_entries: vec![
                "content noraneko ../../noraneko/content/ contentaccessible=yes".into(),
                "skin noraneko classic/1.0 ../../noraneko/skin/".into(),
                "resource noraneko ../../noraneko/resource/ contentaccessible=yes".into(),
            ],
            document: "browser/chrome/browser/content/browser/browser.xhtml".into(),
            document_script: r#"Services.scriptloader.loadSubScript("chrome://noraneko/content/injectBrowser.inc.js", this);"#
                .into(),
        }
    }
}

/// Complete build configuration.
///
/// Relative paths are resolved against `project_root` by
/// [`OutputLayout`](crate::runtime::OutputLayout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    #[serde(skip)]
    pub project_root: PathBuf,
    /// Host runtime version tag recorded in the marker file.
    pub version: String,
    pub source_root: PathBuf,
    pub public_dir: PathBuf,
    /// Overlay output root, emptied by the bundle stage.
    pub overlay_root: PathBuf,
    /// Installed host runtime root, owned by the bootstrapper.
    pub runtime_root: PathBuf,
    /// Packaged host runtime archive (`.tar.zst` or `.tar.gz`).
    pub archive: PathBuf,
    /// Marker file name inside the runtime root.
    pub marker_file: String,
    pub logs_dir: PathBuf,
    pub bundle: BundleOptions,
    pub style: SubtreeRule,
    /// Module-copy subtrees, each run as its own concurrent stage.
    pub modules: Vec<SubtreeRule>,
    pub transpile: TranspileSettings,
    /// Style preprocessor command. Without one styles pass through unchanged.
    pub style_command: Option<CommandSpec>,
    pub host: HostOptions,
    pub patches: PatchOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        let module_rewrites = vec![
            ExtensionRewrite::new("ts", "js"),
            ExtensionRewrite::new("mts", "mjs"),
            ExtensionRewrite::new("cts", "cjs"),
            ExtensionRewrite::new("tsx", "jsx"),
        ];
        Self {
            project_root: PathBuf::from("."),
            version: "000".into(),
            source_root: "src".into(),
            public_dir: "public".into(),
            overlay_root: "dist/noraneko".into(),
            runtime_root: "dist/bin".into(),
            archive: "bin.tar.zst".into(),
            marker_file: "nora.version.txt".into(),
            logs_dir: "dist/logs".into(),
            bundle: BundleOptions::default(),
            style: SubtreeRule {
                name: "skin".into(),
                source: "src/skin".into(),
                output: "dist/noraneko/skin".into(),
                rewrites: vec![ExtensionRewrite::new("pcss", "css")],
            },
            modules: vec![
                SubtreeRule {
                    name: "modules".into(),
                    source: "src/modules".into(),
                    output: "dist/noraneko/resource/modules".into(),
                    rewrites: module_rewrites.clone(),
                },
                SubtreeRule {
                    name: "private-components".into(),
                    source: "src/private/browser/components".into(),
                    output: "dist/noraneko/private/resource/modules".into(),
                    rewrites: module_rewrites,
                },
            ],
            transpile: TranspileSettings::default(),
            style_command: None,
            host: HostOptions::default(),
            patches: PatchOptions::default(),
        }
    }
}

impl BuildOptions {
    /// Defaults rooted at `project_root`.
    pub fn with_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Load options for a project.
    ///
    /// Reads [`OPTIONS_FILE`] if it exists, applies the [`VERSION_ENV`]
    /// override, then validates.
    pub fn load(project_root: &Path) -> OverlayResult<Self> {
        let path = project_root.join(OPTIONS_FILE);
        let mut options = if path.is_file() {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                OverlayError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let options: BuildOptions = serde_json::from_str(&raw).map_err(|e| {
                OverlayError::Config(format!("Invalid options in {}: {}", path.display(), e))
            })?;
            tracing::debug!(path = %path.display(), "Loaded build options");
            options
        } else {
            BuildOptions::default()
        };
        options.project_root = project_root.to_path_buf();

        if let Ok(version) = std::env::var(VERSION_ENV)
            && !version.is_empty()
        {
            tracing::debug!(version = %version, "Version overridden from environment");
            options.version = version;
        }

        options.validate()?;
        Ok(options)
    }

    /// Check invariants the pipeline relies on.
    ///
    /// - the version tag is a single non-empty line
    /// - concurrent stage outputs (style and module subtrees) are pairwise
    ///   disjoint
    /// - the overlay root is not inside the runtime root, which the
    ///   bootstrapper may delete
    pub fn validate(&self) -> OverlayResult<()> {
        if self.version.trim().is_empty() || self.version.contains(['\n', '\r']) {
            return Err(OverlayError::Config(format!(
                "version must be a single non-empty line, got {:?}",
                self.version
            )));
        }

        if self.marker_file.is_empty() || self.marker_file.contains(['/', '\\']) {
            return Err(OverlayError::Config(format!(
                "marker_file must be a plain file name, got {:?}",
                self.marker_file
            )));
        }

        let concurrent: Vec<&SubtreeRule> =
            std::iter::once(&self.style).chain(self.modules.iter()).collect();
        for (i, a) in concurrent.iter().enumerate() {
            for b in &concurrent[i + 1..] {
                if a.name == b.name {
                    return Err(OverlayError::Config(format!(
                        "stage name '{}' is used twice",
                        a.name
                    )));
                }
                if a.output.starts_with(&b.output) || b.output.starts_with(&a.output) {
                    return Err(OverlayError::Config(format!(
                        "stage outputs overlap: '{}' ({}) and '{}' ({})",
                        a.name,
                        a.output.display(),
                        b.name,
                        b.output.display()
                    )));
                }
            }
        }

        let overlay_root = self.resolved(&self.overlay_root);
        let runtime_root = self.resolved(&self.runtime_root);
        if overlay_root.starts_with(&runtime_root) {
            return Err(OverlayError::Config(format!(
                "overlay_root {} must not live inside runtime_root {}",
                self.overlay_root.display(),
                self.runtime_root.display()
            )));
        }

        // The bundle stage empties the overlay root on every run.
        if overlay_root == self.resolved(Path::new("")) {
            return Err(OverlayError::Config(
                "overlay_root must not be the project root".into(),
            ));
        }
        let protected = [
            ("runtime_root", &self.runtime_root),
            ("source_root", &self.source_root),
            ("public_dir", &self.public_dir),
            ("archive", &self.archive),
        ];
        for (field, path) in protected {
            if self.resolved(path).starts_with(&overlay_root) {
                return Err(OverlayError::Config(format!(
                    "overlay_root {} must not contain {} {}",
                    self.overlay_root.display(),
                    field,
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// `path` joined onto the project root with `.` components dropped.
    fn resolved(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect();
        self.project_root
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect::<PathBuf>()
            .join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let options = BuildOptions::default();
        options.validate().unwrap();
        assert_eq!(options.modules.len(), 2);
        assert_eq!(options.version, "000");
    }

    #[test]
    fn test_default_rewrites_cover_typescript_extensions() {
        let options = BuildOptions::default();
        let layout = crate::runtime::OutputLayout::new(&options);
        let mapping = crate::build::OutputMapping::from_rule(&options.modules[0], &layout);
        for (source, output) in [
            ("a.ts", "a.js"),
            ("a.mts", "a.mjs"),
            ("a.cts", "a.cjs"),
            ("view.tsx", "view.jsx"),
            ("view.jsx", "view.jsx"),
        ] {
            assert_eq!(mapping.map_relative(Path::new(source)), PathBuf::from(output));
        }
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let options = BuildOptions::load(dir.path()).unwrap();
        assert_eq!(options.project_root, dir.path());
        assert_eq!(options.runtime_root, PathBuf::from("dist/bin"));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(OPTIONS_FILE),
            r#"{ "archive": "host.tar.gz", "host": { "args": ["--jsconsole"] } }"#,
        )
        .unwrap();

        let options = BuildOptions::load(dir.path()).unwrap();
        assert_eq!(options.archive, PathBuf::from("host.tar.gz"));
        assert_eq!(options.host.args, vec!["--jsconsole"]);
        // untouched nested fields keep their defaults
        assert_eq!(options.host.profile_dir, PathBuf::from("dist/profile/test"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(OPTIONS_FILE), "{ not json").unwrap();

        let err = BuildOptions::load(dir.path()).unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));
    }

    #[test]
    fn test_overlapping_module_outputs_rejected() {
        let mut options = BuildOptions::default();
        options.modules[1].output = options.modules[0].output.join("nested");
        assert!(matches!(options.validate(), Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_overlay_inside_runtime_rejected() {
        let options = BuildOptions {
            overlay_root: "dist/bin/overlay".into(),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_overlay_containing_runtime_rejected() {
        let options = BuildOptions {
            overlay_root: "dist".into(),
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("runtime_root"));
    }

    #[test]
    fn test_overlay_containing_sources_rejected() {
        let options = BuildOptions {
            overlay_root: "./src".into(),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = BuildOptions {
            overlay_root: "out".into(),
            source_root: "out/src".into(),
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("source_root"));
    }

    #[test]
    fn test_overlay_at_project_root_rejected() {
        for overlay_root in [".", "", "./"] {
            let options = BuildOptions {
                overlay_root: overlay_root.into(),
                ..BuildOptions::with_root("/p")
            };
            let err = options.validate().unwrap_err();
            assert!(
                matches!(err, OverlayError::Config(_)),
                "{:?} accepted",
                overlay_root
            );
        }
    }

    #[test]
    fn test_overlay_containing_archive_rejected() {
        let options = BuildOptions {
            archive: "dist/noraneko/bin.tar.zst".into(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_multiline_version_rejected() {
        let options = BuildOptions {
            version: "001\n002".into(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
