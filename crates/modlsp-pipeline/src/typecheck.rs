//! Bottom-up type checking (spec §4.4.3): processed in metadata-DAG order so
//! a package's dependencies are already typed (or known to have failed)
//! before it is. Per-package atomic: either a package produces a
//! [`TypedPackage`] or it hard-fails with a diagnostic, but one package's
//! failure never stops its dependents from being attempted with
//! best-effort signatures for the parts that did resolve (spec §4.4.5).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use modlsp_snapshot::Db as SnapshotDb;
use modlsp_snapshot::MetadataGraphInput;
use modlsp_snapshot::PackageId;
use modlsp_snapshot::ParseMode;
use modlsp_snapshot::Snapshot;

use crate::errors::PipelineDiagnostic;

/// Identity of one exported declaration, comparable only within the
/// snapshot it was produced from (spec §4.4.3's "cross-package identity is
/// `(package-id, object-id)`").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    pub package_id: PackageId,
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedObject {
    pub id: ObjectId,
    pub name: String,
    pub exported: bool,
}

/// A package's type-checked surface: exported objects always present;
/// `private_objects` only populated when a dependent needed the "fully
/// loaded" form (method sets/generics), not just the export-only fast path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedPackage {
    pub package_id: PackageId,
    pub exported_objects: Vec<TypedObject>,
    pub private_objects: Vec<TypedObject>,
}

impl TypedPackage {
    #[must_use]
    pub fn objects(&self) -> impl Iterator<Item = &TypedObject> {
        self.exported_objects.iter().chain(&self.private_objects)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeCheckResult {
    pub typed_package: Option<TypedPackage>,
    pub diagnostics: Vec<PipelineDiagnostic>,
}

/// Export-only (fast) vs. fully loaded (method sets/generics) dependency
/// resolution, per spec §4.4.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadDepth {
    ExportsOnly,
    Full,
}

/// Topologically order `graph`'s packages by import edges (dependencies
/// before dependents). Cycles -- which a well-formed build shouldn't
/// produce, but a broken one might -- are broken by processing any
/// remaining package once nothing else is ready, so type checking still
/// makes progress instead of stalling (spec §4.4.5's "type errors are
/// diagnostics, not failures").
#[must_use]
pub fn topological_order(graph: MetadataGraphInput, db: &dyn SnapshotDb) -> Vec<PackageId> {
    let packages = graph.packages(db);
    let mut remaining: BTreeSet<PackageId> = packages.keys().copied().collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready: Vec<PackageId> = remaining
            .iter()
            .copied()
            .filter(|id| {
                packages[id]
                    .imports
                    .values()
                    .all(|dep| !remaining.contains(dep))
            })
            .collect();

        let batch = if ready.is_empty() {
            // Cycle: take the lowest id deterministically rather than stall.
            vec![*remaining.iter().next().unwrap()]
        } else {
            ready
        };

        for id in batch {
            remaining.remove(&id);
            ordered.push(id);
        }
    }

    ordered
}

/// Type-check one package given its already-typed dependencies.
///
/// There's no real type system here (spec.md never defines one for this
/// generic language); declarations extracted at parse time stand in for a
/// type signature, and the only "type errors" this toy checker can surface
/// are unresolved imports and duplicate top-level names within one package
/// -- both of which are still real bottom-up-dependent facts.
pub fn type_check_package(
    snapshot: &Snapshot,
    graph: MetadataGraphInput,
    package_id: PackageId,
    typed_dependencies: &BTreeMap<PackageId, TypedPackage>,
    depth: LoadDepth,
) -> TypeCheckResult {
    let db = snapshot.db();
    let Some(metadata) = graph.get(db, package_id) else {
        return TypeCheckResult {
            typed_package: None,
            diagnostics: vec![PipelineDiagnostic::new(format!(
                "package {package_id:?} has no metadata in this view"
            ))],
        };
    };

    let mut diagnostics: Vec<PipelineDiagnostic> = metadata
        .loader_diagnostics
        .iter()
        .cloned()
        .map(PipelineDiagnostic::new)
        .collect();

    for (import_path, target) in &metadata.imports {
        if !typed_dependencies.contains_key(target) && graph.get(db, *target).is_none() {
            diagnostics.push(PipelineDiagnostic::new(format!(
                "unresolved import {import_path:?}"
            )));
        }
    }

    let mut exported_objects = Vec::new();
    let mut private_objects = Vec::new();
    let mut seen_names = BTreeSet::new();
    let mut next_index = 0u32;

    for file in metadata.sources() {
        let path = file.path(db).clone();
        let parsed = snapshot.parse(&path, ParseMode::DeclarationsOnly);
        for decl in parsed.declarations() {
            if !seen_names.insert(decl.name.clone()) {
                diagnostics.push(PipelineDiagnostic::new(format!(
                    "duplicate top-level declaration {:?} in package {:?}",
                    decl.name, metadata.module_path
                )));
            }
            let object = TypedObject {
                id: ObjectId { package_id, index: next_index },
                name: decl.name.clone(),
                exported: decl.exported,
            };
            next_index += 1;
            if object.exported {
                exported_objects.push(object);
            } else if matches!(depth, LoadDepth::Full) {
                private_objects.push(object);
            }
        }
    }

    TypeCheckResult {
        typed_package: Some(TypedPackage { package_id, exported_objects, private_objects }),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use modlsp_snapshot::Metadata;
    use modlsp_snapshot::SequenceCounter;
    use modlsp_snapshot::SnapshotDatabase;
    use modlsp_source::InMemoryFileSystem;

    use super::*;

    fn snapshot_with(files: &[(&str, &str)]) -> (Snapshot, SnapshotDatabase) {
        let mut fs = InMemoryFileSystem::new();
        for (path, content) in files {
            fs.add_file((*path).into(), (*content).to_string());
        }
        let db = SnapshotDatabase::for_tests(Arc::new(fs));
        let counter = SequenceCounter::default();
        let snapshot = Snapshot::initial(&db, &counter);
        (snapshot, db)
    }

    #[test]
    fn topological_order_puts_dependencies_before_dependents() {
        let (_snapshot, db) = snapshot_with(&[("a.src", "pub fn a() {}"), ("b.src", "pub fn b() {}")]);
        let a_id = PackageId::new(&db, "a".to_string());
        let b_id = PackageId::new(&db, "b".to_string());

        let a = Metadata {
            package_id: a_id,
            module_path: "a".to_string(),
            compiled_sources: vec![db.file(camino::Utf8Path::new("a.src"))],
            non_compiled_sources: vec![],
            imports: BTreeMap::new(),
            loader_diagnostics: vec![],
            is_test: false,
            test_of: None,
        };
        let mut b = Metadata {
            package_id: b_id,
            module_path: "b".to_string(),
            compiled_sources: vec![db.file(camino::Utf8Path::new("b.src"))],
            non_compiled_sources: vec![],
            imports: BTreeMap::new(),
            loader_diagnostics: vec![],
            is_test: false,
            test_of: None,
        };
        b.imports.insert("a".to_string(), a_id);

        let mut packages = BTreeMap::new();
        packages.insert(a_id, a);
        packages.insert(b_id, b);
        let graph = MetadataGraphInput::new(&db, packages);

        let order = topological_order(graph, &db);
        let a_pos = order.iter().position(|id| *id == a_id).unwrap();
        let b_pos = order.iter().position(|id| *id == b_id).unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn duplicate_top_level_names_are_a_diagnostic_not_a_failure() {
        let (snapshot, db) =
            snapshot_with(&[("a.src", "pub fn dup() {}\npub fn dup() {}\n")]);
        let id = PackageId::new(&db, "a".to_string());
        let metadata = Metadata {
            package_id: id,
            module_path: "a".to_string(),
            compiled_sources: vec![db.file(camino::Utf8Path::new("a.src"))],
            non_compiled_sources: vec![],
            imports: BTreeMap::new(),
            loader_diagnostics: vec![],
            is_test: false,
            test_of: None,
        };
        let mut packages = BTreeMap::new();
        packages.insert(id, metadata);
        let graph = MetadataGraphInput::new(&db, packages);

        let result = type_check_package(&snapshot, graph, id, &BTreeMap::new(), LoadDepth::Full);
        assert!(result.typed_package.is_some());
        assert!(result.diagnostics.iter().any(|d| d.message.contains("duplicate")));
    }
}
