//! Task: Module-copy stage.
//!
//! Runs once per module subtree. Entries are transformed concurrently; a
//! failing entry never stops its siblings.
//!
//! For module entries:
//! 1. transpile the source
//! 2. append `//# sourceMappingURL=<file>.map` when a map came back
//! 3. write code, then the map (a failed map write removes the code file)
//!
//! Non-module entries are copied byte-for-byte to their mapped path.

use super::{BuildCtx, copy_output, finish, remove_stale, task_start, write_output};
use crate::build::mapping::{OutputMapping, PlannedEntry, map_path};
use crate::build::source::{EntryKind, discover};
use crate::collab::{SourceDialect, TranspileOptions, Transpiler};
use crate::pipeline::{PipelineTask, StageReport, TaskResult};
use crate::runtime::{SubtreeRule, TranspileSettings};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::PathBuf;

pub struct ModuleCopyTask {
    rule: SubtreeRule,
}

impl ModuleCopyTask {
    pub fn new(rule: SubtreeRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl PipelineTask<BuildCtx> for ModuleCopyTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> TaskResult {
        let task_name = self.name();
        task_start(&ctx, task_name);

        let mut report = StageReport::new(task_name);
        let mapping = OutputMapping::from_rule(&self.rule, &ctx.layout);
        let entries = match discover(mapping.source_root()) {
            Ok(entries) => entries,
            Err(e) => {
                report.record_error(mapping.source_root(), e.to_string());
                return Ok(finish(task_name, report));
            }
        };

        let planned = mapping.plan(entries, &mut report);
        let transpiler = ctx.collaborators.transpiler.as_ref();
        let settings = &ctx.options.transpile;

        let results = join_all(planned.iter().map(|planned| async move {
            let result = match planned.entry.kind {
                EntryKind::Module(dialect) => {
                    transpile_entry(transpiler, settings, dialect, planned).await
                }
                _ => copy_output(&planned.source, &planned.output)
                    .await
                    .map(|()| vec![planned.output.clone()])
                    .map_err(|e| format!("copy failed: {}", e)),
            };
            (planned, result)
        }))
        .await;

        for (planned, result) in results {
            match result {
                Ok(written) => written.into_iter().for_each(|path| report.record_written(path)),
                Err(message) => {
                    // No output may survive for a failed entry.
                    remove_stale(&planned.output).await;
                    remove_stale(&map_path(&planned.output)).await;
                    report.record_error(planned.source.clone(), message);
                }
            }
        }

        Ok(finish(task_name, report))
    }

    fn name(&self) -> &str {
        &self.rule.name
    }
}

async fn transpile_entry(
    transpiler: &dyn Transpiler,
    settings: &TranspileSettings,
    dialect: SourceDialect,
    planned: &PlannedEntry,
) -> Result<Vec<PathBuf>, String> {
    let source = tokio::fs::read_to_string(&planned.source)
        .await
        .map_err(|e| format!("read failed: {}", e))?;

    let options = TranspileOptions {
        file_name: planned.source.clone(),
        target: settings.target.clone(),
        dialect,
        decorators: settings.decorators,
        dynamic_import: settings.dynamic_import,
        import_assertions: settings.import_assertions,
        source_maps: settings.source_maps,
    };
    let output = transpiler
        .transform(&source, &options)
        .await
        .map_err(|e| e.to_string())?;

    let map_file = map_path(&planned.output);
    let mut code = output.code;
    if output.source_map.is_some()
        && let Some(name) = map_file.file_name()
    {
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("//# sourceMappingURL=");
        code.push_str(&name.to_string_lossy());
        code.push('\n');
    }

    write_output(&planned.output, &code)
        .await
        .map_err(|e| format!("write failed: {}", e))?;
    let mut written = vec![planned.output.clone()];

    if let Some(map) = output.source_map {
        write_output(&map_file, map)
            .await
            .map_err(|e| format!("source map write failed: {}", e))?;
        written.push(map_file);
    }

    Ok(written)
}
