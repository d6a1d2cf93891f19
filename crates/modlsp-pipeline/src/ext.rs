//! [`SnapshotTypeCheck`]: the extension trait that puts a `type_check`/
//! `analyze` surface on `modlsp_snapshot::Snapshot` without `modlsp-snapshot`
//! depending on this crate (legal under Rust's orphan rules since the trait
//! is defined here, not there; see `Snapshot::db()`'s doc comment).
//!
//! Per-snapshot memoization for both operations lives in [`PipelineCaches`],
//! owned by whatever constructs the view (`modlsp-session`) and threaded
//! into every call -- `Snapshot` itself only knows about the Snapshot
//! Engine's salsa jar, not the pipeline's.

use std::collections::BTreeMap;
use std::sync::Arc;

use modlsp_snapshot::PackageId;
use modlsp_snapshot::Snapshot;
use modlsp_source::FxDashMap;

use crate::analyzer::analyze_package;
use crate::analyzer::Analyzer;
use crate::analyzer::AnalysisResult;
use crate::analyzer::FailedAnalyzers;
use crate::typecheck::type_check_package;
use crate::typecheck::topological_order;
use crate::typecheck::LoadDepth;
use crate::typecheck::TypeCheckResult;
use crate::typecheck::TypedPackage;

/// Memoizes type-check results per `(snapshot sequence, package-id)` and
/// tracks which analyzers have panicked for a given snapshot. Shared across
/// every `Snapshot` clone for one view; a new view gets a fresh instance.
#[derive(Default)]
pub struct PipelineCaches {
    type_checks: FxDashMap<(u64, PackageId), Arc<TypeCheckResult>>,
    failed_analyzers: FailedAnalyzers,
}

impl PipelineCaches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

pub trait SnapshotTypeCheck {
    /// Type-check `package_id`, and transitively every dependency it needs,
    /// bottom-up over the metadata DAG (spec §4.4.3). Memoized per
    /// `(snapshot, package-id)`.
    fn type_check(&self, caches: &PipelineCaches, package_id: PackageId) -> Arc<TypeCheckResult>;

    /// Run `analyzers` over `package_id`'s typed package (spec §4.4.4),
    /// after ensuring it's type-checked.
    fn analyze(
        &self,
        caches: &PipelineCaches,
        analyzers: &[Arc<dyn Analyzer>],
        package_id: PackageId,
    ) -> AnalysisResult;
}

impl SnapshotTypeCheck for Snapshot {
    fn type_check(&self, caches: &PipelineCaches, package_id: PackageId) -> Arc<TypeCheckResult> {
        let sequence = self.sequence();
        if let Some(cached) = caches.type_checks.get(&(sequence, package_id)) {
            return Arc::clone(&cached);
        }

        let Some(graph) = self.db().metadata_graph() else {
            let result = Arc::new(TypeCheckResult { typed_package: None, diagnostics: Vec::new() });
            caches.type_checks.insert((sequence, package_id), Arc::clone(&result));
            return result;
        };

        let order = topological_order(graph, self.db());
        let mut typed_by_id: BTreeMap<PackageId, TypedPackage> = BTreeMap::new();

        for id in order {
            if let Some(cached) = caches.type_checks.get(&(sequence, id)) {
                if let Some(typed) = &cached.typed_package {
                    typed_by_id.insert(id, typed.clone());
                }
                continue;
            }

            let depth = if id == package_id { LoadDepth::Full } else { LoadDepth::ExportsOnly };
            let result = type_check_package(self, graph, id, &typed_by_id, depth);
            if let Some(typed) = &result.typed_package {
                typed_by_id.insert(id, typed.clone());
            }
            caches.type_checks.insert((sequence, id), Arc::new(result));

            if id == package_id {
                break;
            }
        }

        caches
            .type_checks
            .get(&(sequence, package_id))
            .map(|entry| Arc::clone(&entry))
            .unwrap_or_else(|| Arc::new(TypeCheckResult { typed_package: None, diagnostics: Vec::new() }))
    }

    fn analyze(
        &self,
        caches: &PipelineCaches,
        analyzers: &[Arc<dyn Analyzer>],
        package_id: PackageId,
    ) -> AnalysisResult {
        let type_check = self.type_check(caches, package_id);
        let Some(typed) = &type_check.typed_package else {
            return AnalysisResult { diagnostics: type_check.diagnostics.clone(), facts: BTreeMap::new() };
        };

        let mut result = analyze_package(analyzers, typed, self.sequence(), &caches.failed_analyzers);
        result.diagnostics.splice(0..0, type_check.diagnostics.iter().cloned());
        result
    }
}
