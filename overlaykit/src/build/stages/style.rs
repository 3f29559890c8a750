//! Task: Style stage.
//!
//! Style entries go through the preprocessor and land at their mapped path
//! with an optional `.map` next to them; every other file in the subtree is
//! copied byte-for-byte.

use super::{BuildCtx, copy_output, finish, remove_stale, task_start, write_output};
use crate::build::mapping::{OutputMapping, PlannedEntry, map_path};
use crate::build::source::{EntryKind, discover};
use crate::collab::StylePreprocessor;
use crate::pipeline::{PipelineTask, StageReport, TaskResult};
use crate::runtime::SubtreeRule;
use async_trait::async_trait;

pub struct StyleTask {
    rule: SubtreeRule,
}

impl StyleTask {
    pub fn new(rule: SubtreeRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl PipelineTask<BuildCtx> for StyleTask {
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

        let preprocessor = ctx.collaborators.preprocessor.as_ref();
        for planned in mapping.plan(entries, &mut report) {
            let result = match planned.entry.kind {
                EntryKind::Style => process_style(preprocessor, &planned).await,
                _ => copy_output(&planned.source, &planned.output)
                    .await
                    .map(|()| vec![planned.output.clone()])
                    .map_err(|e| format!("copy failed: {}", e)),
            };
            match result {
                Ok(written) => written.into_iter().for_each(|path| report.record_written(path)),
                Err(message) => report.record_error(planned.source.clone(), message),
            }
        }

        Ok(finish(task_name, report))
    }

    fn name(&self) -> &str {
        &self.rule.name
    }
}

async fn process_style(
    preprocessor: &dyn StylePreprocessor,
    planned: &PlannedEntry,
) -> Result<Vec<std::path::PathBuf>, String> {
    let source = tokio::fs::read_to_string(&planned.source)
        .await
        .map_err(|e| format!("read failed: {}", e))?;
    let output = preprocessor
        .process(&source, &planned.source, &planned.output)
        .await
        .map_err(|e| e.to_string())?;

    write_output(&planned.output, &output.css)
        .await
        .map_err(|e| format!("write failed: {}", e))?;
    let mut written = vec![planned.output.clone()];

    if let Some(map) = output.source_map {
        let map_file = map_path(&planned.output);
        if let Err(e) = write_output(&map_file, map).await {
            remove_stale(&planned.output).await;
            return Err(format!("source map write failed: {}", e));
        }
        written.push(map_file);
    }

    Ok(written)
}
