//! Output mapping rule.
//!
//! `output = output_root / relative` with the final extension rewritten
//! according to the subtree's rewrite table. The mapping is pure; collisions
//! are detected up front by [`OutputMapping::plan`] so no stage ever writes
//! one output path from two sources. Module and style entries also claim
//! their `.map` sidecar.

use crate::build::source::{EntryKind, SourceEntry};
use crate::pipeline::StageReport;
use crate::runtime::{ExtensionRewrite, OutputLayout, SubtreeRule};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapping {
    source_root: PathBuf,
    output_root: PathBuf,
    rewrites: Vec<ExtensionRewrite>,
}

/// A source entry with both of its resolved paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry: SourceEntry,
    pub source: PathBuf,
    pub output: PathBuf,
}

impl OutputMapping {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        rewrites: Vec<ExtensionRewrite>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            rewrites,
        }
    }

    pub fn from_rule(rule: &SubtreeRule, layout: &OutputLayout) -> Self {
        Self::new(
            layout.resolve(&rule.source),
            layout.resolve(&rule.output),
            rule.rewrites.clone(),
        )
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Output path relative to the output root.
    pub fn map_relative(&self, relative: &Path) -> PathBuf {
        let ext = relative.extension().and_then(|ext| ext.to_str());
        match ext.and_then(|ext| self.rewrites.iter().find(|rw| rw.from == ext)) {
            Some(rewrite) => relative.with_extension(&rewrite.to),
            None => relative.to_path_buf(),
        }
    }

    pub fn output_path(&self, relative: &Path) -> PathBuf {
        self.output_root.join(self.map_relative(relative))
    }

    /// Resolve every entry, rejecting all entries that share an output path.
    ///
    /// Each colliding entry is recorded once on `report`; the returned plan
    /// holds only collision-free entries, in input order.
    pub fn plan(&self, entries: Vec<SourceEntry>, report: &mut StageReport) -> Vec<PlannedEntry> {
        let mut by_output: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        let planned: Vec<PlannedEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let output = self.output_path(&entry.relative);
                if emits_map(entry.kind) {
                    by_output.entry(map_path(&output)).or_default().push(index);
                }
                by_output.entry(output.clone()).or_default().push(index);
                PlannedEntry {
                    source: self.source_root.join(&entry.relative),
                    output,
                    entry,
                }
            })
            .collect();

        let mut rejected = vec![false; planned.len()];
        for (output, indices) in &by_output {
            if indices.len() < 2 {
                continue;
            }
            for &index in indices {
                if rejected[index] {
                    continue;
                }
                let others: BTreeSet<String> = indices
                    .iter()
                    .filter(|&&other| other != index)
                    .map(|&other| planned[other].entry.relative.display().to_string())
                    .collect();
                report.record_error(
                    planned[index].source.clone(),
                    format!(
                        "output path {} collides with {}",
                        output.display(),
                        others.into_iter().collect::<Vec<_>>().join(", ")
                    ),
                );
                rejected[index] = true;
            }
        }

        planned
            .into_iter()
            .zip(rejected)
            .filter_map(|(entry, rejected)| (!rejected).then_some(entry))
            .collect()
    }
}

/// Path of the source map written next to `output`.
pub fn map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".map");
    name.into()
}

fn emits_map(kind: EntryKind) -> bool {
    matches!(kind, EntryKind::Module(_) | EntryKind::Style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_mapping() -> OutputMapping {
        OutputMapping::new(
            "/p/src/modules",
            "/p/dist/noraneko/resource/modules",
            vec![ExtensionRewrite::new("ts", "js"), ExtensionRewrite::new("mts", "mjs")],
        )
    }

    #[test]
    fn test_rewrites_final_extension_only() {
        let mapping = module_mapping();
        assert_eq!(
            mapping.map_relative(Path::new("utils/a.ts")),
            PathBuf::from("utils/a.js")
        );
        assert_eq!(mapping.map_relative(Path::new("b.mts")), PathBuf::from("b.mjs"));
        assert_eq!(mapping.map_relative(Path::new("types.d.ts")), PathBuf::from("types.d.js"));
        assert_eq!(mapping.map_relative(Path::new("data.json")), PathBuf::from("data.json"));
        assert_eq!(
            mapping.output_path(Path::new("a.ts")),
            PathBuf::from("/p/dist/noraneko/resource/modules/a.js")
        );
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let mapping = module_mapping();
        let entries = vec![SourceEntry::new("a.ts"), SourceEntry::new("b/c.mts")];

        let first = mapping.plan(entries.clone(), &mut StageReport::new("modules"));
        let second = mapping.plan(entries, &mut StageReport::new("modules"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_entries_get_distinct_outputs() {
        let mapping = module_mapping();
        let entries = vec![
            SourceEntry::new("a.ts"),
            SourceEntry::new("a.mts"),
            SourceEntry::new("sub/a.ts"),
            SourceEntry::new("a.json"),
        ];
        let mut report = StageReport::new("modules");
        let plan = mapping.plan(entries, &mut report);

        assert!(report.is_clean());
        let outputs: std::collections::BTreeSet<_> = plan.iter().map(|p| &p.output).collect();
        assert_eq!(outputs.len(), 4);
    }

    #[test]
    fn test_collision_rejects_every_party() {
        let mapping = module_mapping();
        let entries = vec![
            SourceEntry::new("a.js"),
            SourceEntry::new("a.ts"),
            SourceEntry::new("b.ts"),
        ];
        let mut report = StageReport::new("modules");
        let plan = mapping.plan(entries, &mut report);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].entry.relative, PathBuf::from("b.ts"));
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.message.contains("collides")));
    }

    #[test]
    fn test_generated_map_collides_with_static_map() {
        let mapping = module_mapping();
        let entries = vec![
            SourceEntry::new("a.js.map"),
            SourceEntry::new("a.ts"),
            SourceEntry::new("b.ts"),
        ];
        let mut report = StageReport::new("modules");
        let plan = mapping.plan(entries, &mut report);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].entry.relative, PathBuf::from("b.ts"));
        assert_eq!(report.errors.len(), 2);
        assert!(
            report
                .errors
                .iter()
                .all(|e| e.message.contains("resource/modules/a.js.map collides"))
        );
    }

    #[test]
    fn test_entry_colliding_twice_is_reported_once() {
        // a.js and a.ts share both the output and its map
        let mapping = module_mapping();
        let mut report = StageReport::new("modules");
        let plan = mapping.plan(
            vec![SourceEntry::new("a.js"), SourceEntry::new("a.ts")],
            &mut report,
        );

        assert!(plan.is_empty());
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_static_entries_claim_no_map() {
        let mapping = module_mapping();
        let mut report = StageReport::new("modules");
        let plan = mapping.plan(
            vec![SourceEntry::new("a.json"), SourceEntry::new("a.json.map")],
            &mut report,
        );

        assert!(report.is_clean());
        assert_eq!(plan.len(), 2);
    }
}
