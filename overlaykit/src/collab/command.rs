//! Collaborators backed by external commands.
//!
//! Protocol:
//! - the transpiler and style preprocessor receive the source on stdin and
//!   their options as `OVERLAYKIT_*` environment variables, and print one
//!   JSON object on stdout (`{"code", "map"}` / `{"css", "map"}`)
//! - the bundler receives the [`BundleRequest`] as JSON on stdin, runs in the
//!   project root, and may print `{"emitted": [...]}`

use super::{
    BundleOutput, BundleRequest, Bundler, CollabError, StyleOutput, StylePreprocessor,
    TranspileOptions, TranspileOutput, Transpiler,
};
use crate::runtime::CommandSpec;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct TranspileReply {
    code: String,
    #[serde(default)]
    map: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StyleReply {
    css: String,
    #[serde(default)]
    map: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BundleReply {
    #[serde(default)]
    emitted: Vec<PathBuf>,
}

#[derive(Serialize)]
struct BundleMessage<'a> {
    root: &'a Path,
    out_dir: &'a Path,
    entries: Vec<BundleMessageEntry<'a>>,
    entry_file_names: &'a str,
    assets_dir: &'a Path,
    sourcemap: bool,
}

#[derive(Serialize)]
struct BundleMessageEntry<'a> {
    name: &'a str,
    path: &'a Path,
}

/// Runs `spec` with `stdin` fed in and returns captured stdout.
async fn run_command(
    spec: &CommandSpec,
    envs: &[(&str, String)],
    stdin: &[u8],
    cwd: Option<&Path>,
) -> Result<Vec<u8>, CollabError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| CollabError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    // Feed stdin concurrently so a chatty child cannot deadlock on a full
    // stdout pipe.
    if let Some(mut pipe) = child.stdin.take() {
        let input = stdin.to_vec();
        let program = spec.program.clone();
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&input).await {
                tracing::debug!(program = %program, "Failed to write command stdin: {}", e);
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| CollabError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(CollabError::Exit {
            program: spec.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

fn parse_reply<T: DeserializeOwned>(program: &str, stdout: &[u8]) -> Result<T, CollabError> {
    serde_json::from_slice(stdout).map_err(|e| CollabError::Protocol {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

fn flag(value: bool) -> String {
    value.to_string()
}

/// Transpiler that runs an external command per module.
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    command: CommandSpec,
}

impl CommandTranspiler {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Transpiler for CommandTranspiler {
    async fn transform(
        &self,
        source: &str,
        options: &TranspileOptions,
    ) -> Result<TranspileOutput, CollabError> {
        let envs = [
            ("OVERLAYKIT_FILENAME", options.file_name.display().to_string()),
            ("OVERLAYKIT_TARGET", options.target.clone()),
            ("OVERLAYKIT_SYNTAX", options.dialect.as_str().to_string()),
            ("OVERLAYKIT_DECORATORS", flag(options.decorators)),
            ("OVERLAYKIT_DYNAMIC_IMPORT", flag(options.dynamic_import)),
            ("OVERLAYKIT_IMPORT_ASSERTIONS", flag(options.import_assertions)),
            ("OVERLAYKIT_SOURCE_MAPS", flag(options.source_maps)),
        ];
        let stdout = run_command(&self.command, &envs, source.as_bytes(), None).await?;
        let reply: TranspileReply = parse_reply(&self.command.program, &stdout)?;
        Ok(TranspileOutput {
            code: reply.code,
            source_map: reply.map.filter(|_| options.source_maps),
        })
    }
}

/// Style preprocessor that runs an external command per stylesheet.
#[derive(Debug, Clone)]
pub struct CommandPreprocessor {
    command: CommandSpec,
}

impl CommandPreprocessor {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl StylePreprocessor for CommandPreprocessor {
    async fn process(
        &self,
        source: &str,
        from: &Path,
        to: &Path,
    ) -> Result<StyleOutput, CollabError> {
        let envs = [
            ("OVERLAYKIT_FROM", from.display().to_string()),
            ("OVERLAYKIT_TO", to.display().to_string()),
        ];
        let stdout = run_command(&self.command, &envs, source.as_bytes(), None).await?;
        let reply: StyleReply = parse_reply(&self.command.program, &stdout)?;
        Ok(StyleOutput {
            css: reply.css,
            source_map: reply.map,
        })
    }
}

/// Bundler that runs one external command for the whole entry graph.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: CommandSpec,
    project_root: PathBuf,
}

impl CommandBundler {
    pub fn new(command: CommandSpec, project_root: &Path) -> Self {
        Self {
            command,
            project_root: project_root.to_path_buf(),
        }
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, CollabError> {
        let message = BundleMessage {
            root: &request.root,
            out_dir: &request.out_dir,
            entries: request
                .entries
                .iter()
                .map(|entry| BundleMessageEntry {
                    name: &entry.name,
                    path: &entry.path,
                })
                .collect(),
            entry_file_names: &request.entry_file_names,
            assets_dir: &request.assets_dir,
            sourcemap: request.sourcemap,
        };
        let stdin = serde_json::to_vec(&message).map_err(|e| CollabError::Protocol {
            program: self.command.program.clone(),
            reason: e.to_string(),
        })?;
        let envs = [("OVERLAYKIT_OUT_DIR", request.out_dir.display().to_string())];

        let stdout = run_command(&self.command, &envs, &stdin, Some(&self.project_root)).await?;
        let reply: BundleReply = if stdout.iter().all(u8::is_ascii_whitespace) {
            BundleReply::default()
        } else {
            parse_reply(&self.command.program, &stdout)?
        };

        Ok(BundleOutput {
            emitted: reply.emitted,
        })
    }
}
