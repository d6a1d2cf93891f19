//! The snapshot contract (spec §4.3.1): an immutable, versioned view of a
//! view's world that answers "give me the current derived artifact X."
//!
//! A [`Snapshot`] wraps a `salsa::Database::snapshot()` clone of the owning
//! [`SnapshotDatabase`] -- salsa's own revision tracking and per-query
//! memoization already give us the bulk of spec §4.3.3's "generational
//! cache" for anything keyed on a `File` input; [`crate::cache`] only covers
//! the content-hash-keyed parse cache salsa can't key on directly.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use camino::Utf8Path;
use modlsp_source::File;
use modlsp_views::View;

use crate::db::Db;
use crate::db::SnapshotDatabase;
use crate::metadata::Metadata;
use crate::metadata::PackageId;
use crate::parse::ParseMode;
use crate::parse::ParsedFile;

/// Allocates the monotonically increasing sequence ids snapshots carry,
/// shared by every clone of a [`SnapshotDatabase`] for one view.
#[derive(Clone, Default)]
pub struct SequenceCounter(Arc<AtomicU64>);

impl SequenceCounter {
    #[must_use]
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel)
    }
}

/// A ranked workspace-symbol search hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolMatch {
    pub package_id: Option<PackageId>,
    pub path: camino::Utf8PathBuf,
    pub name: String,
    pub offset: u32,
    pub score: u32,
}

/// An immutable, versioned read handle into one view's world.
///
/// Safe to call concurrently from any number of threads: every method here
/// only reads from `db`, which is itself a read-only salsa snapshot.
pub struct Snapshot {
    db: SnapshotDatabase,
    sequence: u64,
    parent: Option<Arc<Snapshot>>,
}

impl Snapshot {
    /// Construct the initial snapshot for a freshly created database.
    #[must_use]
    pub fn initial(db: &SnapshotDatabase, sequence: &SequenceCounter) -> Self {
        Self {
            db: db.clone(),
            sequence: sequence.next(),
            parent: None,
        }
    }

    /// Clone a new snapshot sharing all unchanged state with `self` (spec
    /// §4.3.2). The caller is expected to have already applied input changes
    /// to `db` (overlay edits, disk events, file create/delete) before
    /// calling this -- salsa's dependency tracking means only the queries
    /// that actually read a changed input recompute.
    #[must_use]
    pub fn cloned_from(&self, db: &SnapshotDatabase, sequence: &SequenceCounter) -> Self {
        Self {
            db: db.clone(),
            sequence: sequence.next(),
            parent: Some(Arc::new(self.snapshot_of_self())),
        }
    }

    fn snapshot_of_self(&self) -> Self {
        Self {
            db: self.db.clone(),
            sequence: self.sequence,
            parent: self.parent.clone(),
        }
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Snapshot> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn view(&self) -> &View {
        self.db.view()
    }

    /// `db` is intentionally exposed so `modlsp-pipeline` can define
    /// extension traits over `Snapshot` for `type_check`/`analyze` without
    /// `modlsp-snapshot` needing to depend on the pipeline crate.
    #[must_use]
    pub fn db(&self) -> &SnapshotDatabase {
        &self.db
    }

    /// `file(uri) -> handle`
    #[must_use]
    pub fn file(&self, path: &Utf8Path) -> File {
        self.db.file(path)
    }

    /// `parse(uri, mode) -> parsed-file`
    #[must_use]
    pub fn parse(&self, path: &Utf8Path, mode: ParseMode) -> ParsedFile {
        let file = self.db.file(path);
        let text = file.source(&self.db);
        self.db.parsed_files().parse(text.as_str(), mode)
    }

    /// `metadata(package-id) -> metadata-or-nil`
    #[must_use]
    pub fn metadata(&self, package_id: PackageId) -> Option<Metadata> {
        self.db.metadata_graph()?.get(&self.db, package_id)
    }

    /// `reverse_dependencies(package-id) -> set of package-id` (transitive)
    #[must_use]
    pub fn reverse_dependencies(&self, package_id: PackageId) -> BTreeSet<PackageId> {
        self.db
            .metadata_graph()
            .map(|graph| graph.reverse_dependencies(&self.db, package_id))
            .unwrap_or_default()
    }

    /// `packages_for_file(uri) -> set of package-id`
    #[must_use]
    pub fn packages_for_file(&self, path: &Utf8Path) -> BTreeSet<PackageId> {
        self.db
            .metadata_graph()
            .map(|graph| graph.packages_for_file(&self.db, path))
            .unwrap_or_default()
    }

    /// `workspace_symbols(query) -> ranked list`
    ///
    /// A simple substring-then-prefix ranking over every tracked file's
    /// declarations-only parse, since spec.md doesn't define a symbol index
    /// data structure of its own.
    #[must_use]
    pub fn workspace_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();
        let mut matches = Vec::new();

        let Some(graph) = self.db.metadata_graph() else {
            return matches;
        };

        for metadata in graph.packages(&self.db).values() {
            for file in metadata.sources() {
                let path = file.path(&self.db).clone();
                let parsed = self.parse(&path, ParseMode::DeclarationsOnly);
                for decl in parsed.declarations() {
                    let name_lower = decl.name.to_lowercase();
                    let score = if name_lower == query_lower {
                        100
                    } else if name_lower.starts_with(&query_lower) {
                        75
                    } else if name_lower.contains(&query_lower) {
                        50
                    } else {
                        continue;
                    };
                    matches.push(SymbolMatch {
                        package_id: Some(metadata.package_id),
                        path: path.clone(),
                        name: decl.name.clone(),
                        offset: decl.offset,
                        score,
                    });
                }
            }
        }

        matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        matches
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modlsp_source::InMemoryFileSystem;

    use super::*;
    use crate::db::SnapshotDatabase;

    fn db_with_file(path: &str, content: &str) -> SnapshotDatabase {
        let mut fs = InMemoryFileSystem::new();
        fs.add_file(path.into(), content.to_string());
        SnapshotDatabase::for_tests(Arc::new(fs))
    }

    #[test]
    fn sequence_ids_increase_monotonically() {
        let counter = SequenceCounter::default();
        let db = SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()));

        let first = Snapshot::initial(&db, &counter);
        let second = first.cloned_from(&db, &counter);

        assert!(second.sequence() > first.sequence());
        assert!(second.parent().is_some());
    }

    #[test]
    fn parse_reuses_content_addressed_tree() {
        let db = db_with_file("/test/a.src", "pub fn main() {}");
        let counter = SequenceCounter::default();
        let snapshot = Snapshot::initial(&db, &counter);

        let first = snapshot.parse(camino::Utf8Path::new("/test/a.src"), ParseMode::Full);
        let second = snapshot.parse(camino::Utf8Path::new("/test/a.src"), ParseMode::Full);
        assert_eq!(first.content_hash(), second.content_hash());
    }

    #[test]
    fn missing_metadata_graph_yields_empty_results() {
        let db = SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()));
        let counter = SequenceCounter::default();
        let snapshot = Snapshot::initial(&db, &counter);

        let package_id = crate::metadata::PackageId::new(&db, "pkg".to_string());
        assert!(snapshot.metadata(package_id).is_none());
        assert!(snapshot.reverse_dependencies(package_id).is_empty());
        assert!(snapshot
            .packages_for_file(camino::Utf8Path::new("/test/a.src"))
            .is_empty());
    }

    #[test]
    fn workspace_symbols_ranks_exact_match_highest() {
        let db = db_with_file(
            "/test/lib.src",
            "pub fn connect() {}\npub fn connection_pool() {}\n",
        );
        let counter = SequenceCounter::default();
        let snapshot = Snapshot::initial(&db, &counter);

        let file = snapshot.file(camino::Utf8Path::new("/test/lib.src"));
        let package_id = crate::metadata::PackageId::new(&db, "lib".to_string());
        let metadata = Metadata {
            package_id,
            module_path: "lib".to_string(),
            compiled_sources: vec![file],
            non_compiled_sources: vec![],
            imports: std::collections::BTreeMap::new(),
            loader_diagnostics: vec![],
            is_test: false,
            test_of: None,
        };
        let mut packages = std::collections::BTreeMap::new();
        packages.insert(package_id, metadata);
        let mut db = db;
        db.set_metadata_graph(crate::metadata::MetadataGraphInput::new(&db, packages));
        let snapshot = Snapshot::initial(&db, &counter);

        let results = snapshot.workspace_symbols("connect");
        assert_eq!(results[0].name, "connect");
    }
}
