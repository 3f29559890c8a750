//! Task: Bundle stage.
//!
//! Empties the overlay root, hands the entry points to the bundler, then
//! copies the public directory verbatim on top of the bundler's output.

use super::{BuildCtx, copy_output, finish, task_start};
use crate::build::source::discover;
use crate::collab::BundleRequest;
use crate::pipeline::{PipelineTask, StageReport, TaskResult};
use crate::runtime::BundleEntry;
use async_trait::async_trait;
use std::io;
use std::path::Path;

pub struct BundleTask;

#[async_trait]
impl PipelineTask<BuildCtx> for BundleTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> TaskResult {
        let task_name = self.name();
        task_start(&ctx, task_name);

        let mut report = StageReport::new(task_name);
        let layout = &ctx.layout;
        let overlay_root = layout.overlay_root();

        if let Err(e) = empty_dir(overlay_root).await {
            report.record_error(overlay_root, format!("cannot clean output root: {}", e));
            return Ok(finish(task_name, report));
        }

        let bundle = &ctx.options.bundle;
        let request = BundleRequest {
            root: layout.source_root().to_path_buf(),
            out_dir: overlay_root.to_path_buf(),
            entries: bundle
                .entries
                .iter()
                .map(|entry| BundleEntry {
                    name: entry.name.clone(),
                    path: layout.resolve(&entry.path),
                })
                .collect(),
            entry_file_names: bundle.entry_file_names.clone(),
            assets_dir: bundle.assets_dir.clone(),
            sourcemap: bundle.sourcemap,
        };

        match ctx.collaborators.bundler.bundle(&request).await {
            Ok(output) => {
                for emitted in output.emitted {
                    report.record_written(overlay_root.join(emitted));
                }
            }
            Err(e) => {
                report.record_error(overlay_root, e.to_string());
                return Ok(finish(task_name, report));
            }
        }

        copy_public(layout.public_dir(), overlay_root, &mut report).await;

        Ok(finish(task_name, report))
    }

    fn name(&self) -> &str {
        "bundle"
    }
}

async fn empty_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(dir).await
}

async fn copy_public(public_dir: &Path, overlay_root: &Path, report: &mut StageReport) {
    let entries = match discover(public_dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.record_error(public_dir, e.to_string());
            return;
        }
    };

    for entry in entries {
        let source = public_dir.join(&entry.relative);
        let output = overlay_root.join(&entry.relative);
        match copy_output(&source, &output).await {
            Ok(()) => report.record_written(output),
            Err(e) => report.record_error(source, format!("copy failed: {}", e)),
        }
    }
}
