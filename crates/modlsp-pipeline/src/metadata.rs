//! Metadata loading (spec §4.4.2): calls the build-info collaborator with a
//! view's build config and requested URIs, then merges the returned package
//! records into the snapshot engine's metadata graph, recomputing
//! reverse-dependency edges and pruning packages the collaborator no longer
//! mentions (unless an open file still belongs to one, in which case it's
//! kept as an orphan with a diagnostic).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use modlsp_collab::BuildInfoCollaborator;
use modlsp_collab::BuildInfoError;
use modlsp_collab::PackageRecord;
use modlsp_snapshot::Db as SnapshotDb;
use modlsp_snapshot::Metadata;
use modlsp_snapshot::MetadataGraphInput;
use modlsp_snapshot::PackageId;
use modlsp_snapshot::SnapshotDatabase;
use modlsp_views::ResolvedEnv;

use crate::errors::PipelineError;

/// Call the build-info collaborator for this view's environment.
///
/// # Errors
///
/// Returns [`PipelineError::Loader`] if the collaborator is unavailable or
/// reports a hard failure; per spec §4.4.5 this becomes a per-package
/// diagnostic (or, if no package can be reasoned about at all, a degraded
/// view) rather than aborting the whole snapshot.
pub async fn load_package_records(
    collaborator: &dyn BuildInfoCollaborator,
    view_root: &Utf8Path,
    env: &ResolvedEnv,
    package_patterns: &[String],
    file_uris: &[String],
) -> Result<Vec<PackageRecord>, PipelineError> {
    collaborator
        .load(env, package_patterns, file_uris)
        .await
        .map_err(|err: BuildInfoError| PipelineError::Loader {
            view_root: view_root.to_owned(),
            source: err.to_string(),
        })
}

/// Merge freshly loaded `records` into a new [`MetadataGraphInput`], pruning
/// packages `records` no longer mentions unless `open_files` still reaches
/// them (spec §4.4.2's "packages not mentioned are pruned unless referenced
/// by an open file, then retained as orphans with a diagnostic").
#[must_use]
pub fn merge_metadata_graph(
    db: &mut SnapshotDatabase,
    records: Vec<PackageRecord>,
    open_files: &BTreeSet<Utf8PathBuf>,
) -> MetadataGraphInput {
    let mut packages = BTreeMap::new();
    let mut id_by_record_id = BTreeMap::new();

    for record in &records {
        let id = PackageId::new(&*db, record.id.clone());
        id_by_record_id.insert(record.id.clone(), id);
    }

    for record in records {
        let id = id_by_record_id[&record.id];
        let imports = record
            .imports
            .iter()
            .filter_map(|(path, target_id)| {
                id_by_record_id.get(target_id).map(|pid| (path.clone(), *pid))
            })
            .collect();
        let test_of = record.test_of.as_ref().and_then(|t| id_by_record_id.get(t).copied());

        let metadata = Metadata {
            package_id: id,
            module_path: record.module_path,
            compiled_sources: record.compiled_sources.iter().map(|p| db.file(p)).collect(),
            non_compiled_sources: record.non_compiled_sources.iter().map(|p| db.file(p)).collect(),
            imports,
            loader_diagnostics: record.diagnostics,
            is_test: record.is_test,
            test_of,
        };
        packages.insert(id, metadata);
    }

    if let Some(previous) = db.metadata_graph() {
        for (previous_id, previous_metadata) in previous.packages(&*db) {
            if packages.contains_key(previous_id) {
                continue;
            }
            let still_open = previous_metadata
                .sources()
                .any(|file| open_files.contains(file.path(&*db)));
            if still_open {
                let mut orphan = previous_metadata.clone();
                orphan.loader_diagnostics.push(
                    "package no longer reported by the build-info collaborator; keeping open file reachable".to_string(),
                );
                packages.insert(*previous_id, orphan);
            }
        }
    }

    MetadataGraphInput::new(&*db, packages)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modlsp_source::InMemoryFileSystem;

    use super::*;

    fn test_db() -> SnapshotDatabase {
        SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()))
    }

    fn record(id: &str, compiled: &[&str]) -> PackageRecord {
        PackageRecord {
            id: id.to_string(),
            path: Utf8PathBuf::from(id),
            module_path: id.to_string(),
            compiled_sources: compiled.iter().map(Utf8PathBuf::from).collect(),
            non_compiled_sources: vec![],
            imports: vec![],
            is_test: false,
            test_of: None,
            diagnostics: vec![],
        }
    }

    #[test]
    fn merging_resolves_import_targets_by_record_id() {
        let mut db = test_db();
        let mut a = record("a", &["a.src"]);
        let mut b = record("b", &["b.src"]);
        b.imports.push(("a".to_string(), "a".to_string()));
        a.diagnostics.push("unused import warning".to_string());

        let graph = merge_metadata_graph(&mut db, vec![a, b], &BTreeSet::new());
        let packages = graph.packages(&db);
        let b_id = packages
            .iter()
            .find(|(_, m)| m.module_path == "b")
            .map(|(id, _)| *id)
            .unwrap();
        let b_metadata = &packages[&b_id];
        assert_eq!(b_metadata.imports.len(), 1);
    }

    #[test]
    fn pruned_package_is_kept_as_orphan_when_an_open_file_still_references_it() {
        let mut db = test_db();
        let first_pass = merge_metadata_graph(&mut db, vec![record("a", &["a.src"])], &BTreeSet::new());
        db.set_metadata_graph(first_pass);

        let mut open = BTreeSet::new();
        open.insert(Utf8PathBuf::from("a.src"));

        let second_pass = merge_metadata_graph(&mut db, vec![], &open);
        let packages = second_pass.packages(&db);
        assert_eq!(packages.len(), 1);
        let orphan = packages.values().next().unwrap();
        assert!(!orphan.loader_diagnostics.is_empty());
    }

    #[test]
    fn pruned_package_disappears_without_an_open_file() {
        let mut db = test_db();
        let first_pass = merge_metadata_graph(&mut db, vec![record("a", &["a.src"])], &BTreeSet::new());
        db.set_metadata_graph(first_pass);

        let second_pass = merge_metadata_graph(&mut db, vec![], &BTreeSet::new());
        assert!(second_pass.packages(&db).is_empty());
    }
}
