//! Analyzer scheduling (spec §4.4.4): a pure function
//! `(typed package, fact store for imports) -> (diagnostics, facts)`,
//! scheduled in topological order over both the package DAG and the
//! analyzer dependency graph, memoized per `(snapshot, analyzer,
//! package-id)`.
//!
//! A panicking analyzer is caught, reported once, and marked failed for the
//! rest of the snapshot; every other analyzer and package keeps going
//! (spec §4.4.5).

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use modlsp_source::FxDashSet;

use crate::errors::PipelineDiagnostic;
use crate::typecheck::TypedPackage;

/// Opaque per-package facts one analyzer hands to analyzers that depend on
/// it, keyed by whatever name the producing analyzer chooses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facts(BTreeMap<String, serde_json::Value>);

impl Facts {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }
}

pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Other analyzers whose facts for the same package must be available
    /// before this one runs.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    fn analyze(&self, typed: &TypedPackage, imported_facts: &Facts) -> (Vec<PipelineDiagnostic>, Facts);
}

/// Topologically orders `analyzers` by `depends_on`. Like
/// [`crate::typecheck::topological_order`], a cycle is broken
/// deterministically rather than rejected outright.
#[must_use]
pub fn schedule_analyzers(analyzers: &[Arc<dyn Analyzer>]) -> Vec<Arc<dyn Analyzer>> {
    let mut remaining: Vec<Arc<dyn Analyzer>> = analyzers.to_vec();
    let mut scheduled_names: Vec<&'static str> = Vec::new();
    let mut ordered = Vec::with_capacity(analyzers.len());

    while !remaining.is_empty() {
        let (ready, not_ready): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|analyzer| {
            analyzer.depends_on().iter().all(|dep| scheduled_names.contains(dep))
        });

        if ready.is_empty() {
            // Cycle among what's left: schedule one to make progress.
            let mut not_ready = not_ready;
            let forced = not_ready.remove(0);
            scheduled_names.push(forced.name());
            ordered.push(forced);
            remaining = not_ready;
            continue;
        }

        for analyzer in &ready {
            scheduled_names.push(analyzer.name());
        }
        ordered.extend(ready);
        remaining = not_ready;
    }

    ordered
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    pub diagnostics: Vec<PipelineDiagnostic>,
    pub facts: BTreeMap<&'static str, Facts>,
}

/// Tracks, for one snapshot, which analyzers have already panicked and
/// should be skipped on every later call for that snapshot (spec §4.4.5).
#[derive(Default)]
pub struct FailedAnalyzers {
    failed: FxDashSet<(u64, &'static str)>,
}

impl FailedAnalyzers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_failed(&self, sequence: u64, analyzer: &'static str) -> bool {
        self.failed.contains(&(sequence, analyzer))
    }

    fn mark_failed(&self, sequence: u64, analyzer: &'static str) {
        self.failed.insert((sequence, analyzer));
    }
}

/// Runs `analyzers` over `typed` in dependency order, feeding each
/// analyzer's facts forward to analyzers that declared a dependency on it.
/// `sequence` identifies the snapshot for [`FailedAnalyzers`] bookkeeping.
pub fn analyze_package(
    analyzers: &[Arc<dyn Analyzer>],
    typed: &TypedPackage,
    sequence: u64,
    failed: &FailedAnalyzers,
) -> AnalysisResult {
    let ordered = schedule_analyzers(analyzers);
    let mut result = AnalysisResult::default();
    let mut produced: BTreeMap<&'static str, Facts> = BTreeMap::new();

    for analyzer in ordered {
        let name = analyzer.name();
        if failed.has_failed(sequence, name) {
            continue;
        }

        let mut imported_facts = Facts::default();
        for dep in analyzer.depends_on() {
            if let Some(facts) = produced.get(dep) {
                for (key, value) in &facts.0 {
                    imported_facts.insert(key.clone(), value.clone());
                }
            }
        }

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            analyzer.analyze(typed, &imported_facts)
        }));

        match outcome {
            Ok((diagnostics, facts)) => {
                result.diagnostics.extend(diagnostics);
                produced.insert(name, facts.clone());
                result.facts.insert(name, facts);
            }
            Err(_) => {
                failed.mark_failed(sequence, name);
                result.diagnostics.push(PipelineDiagnostic::new(format!(
                    "analyzer {name:?} panicked and was disabled for this snapshot"
                )));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typecheck::ObjectId;
    use modlsp_snapshot::PackageId;
    use modlsp_snapshot::SnapshotDatabase;
    use modlsp_source::InMemoryFileSystem;

    struct CountsExports;
    impl Analyzer for CountsExports {
        fn name(&self) -> &'static str {
            "counts_exports"
        }
        fn analyze(&self, typed: &TypedPackage, _imported: &Facts) -> (Vec<PipelineDiagnostic>, Facts) {
            let mut facts = Facts::default();
            facts.insert("export_count", serde_json::json!(typed.exported_objects.len()));
            (Vec::new(), facts)
        }
    }

    struct PanicsAlways;
    impl Analyzer for PanicsAlways {
        fn name(&self) -> &'static str {
            "panics_always"
        }
        fn analyze(&self, _typed: &TypedPackage, _imported: &Facts) -> (Vec<PipelineDiagnostic>, Facts) {
            panic!("boom");
        }
    }

    fn typed_package() -> TypedPackage {
        let db = SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()));
        let package_id = PackageId::new(&db, "pkg".to_string());
        TypedPackage {
            package_id,
            exported_objects: vec![crate::typecheck::TypedObject {
                id: ObjectId { package_id, index: 0 },
                name: "thing".to_string(),
                exported: true,
            }],
            private_objects: vec![],
        }
    }

    #[test]
    fn a_panicking_analyzer_is_marked_failed_and_others_still_run() {
        let typed = typed_package();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(PanicsAlways), Arc::new(CountsExports)];
        let failed = FailedAnalyzers::new();

        let result = analyze_package(&analyzers, &typed, 1, &failed);

        assert!(failed.has_failed(1, "panics_always"));
        assert!(!failed.has_failed(1, "counts_exports"));
        assert!(result.facts.contains_key("counts_exports"));
        assert!(result.diagnostics.iter().any(|d| d.message.contains("panicked")));
    }

    #[test]
    fn a_previously_failed_analyzer_is_skipped_on_a_later_call_for_the_same_snapshot() {
        let typed = typed_package();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(PanicsAlways)];
        let failed = FailedAnalyzers::new();

        analyze_package(&analyzers, &typed, 7, &failed);
        let second = analyze_package(&analyzers, &typed, 7, &failed);

        assert!(second.diagnostics.is_empty());
    }
}
