//! The package metadata graph the snapshot engine maintains per view.
//!
//! A [`MetadataGraphInput`] is the salsa input the Package Pipeline writes to
//! once it has loaded build information from the external build-info
//! collaborator; the snapshot-contract queries (`metadata`,
//! `reverse_dependencies`, `packages_for_file`) only ever read it.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use camino::Utf8Path;
use modlsp_source::File;

use crate::db::Db;

/// Interned identity of a package within a view's metadata graph.
#[salsa::interned(no_lifetime, debug)]
pub struct PackageId {
    #[returns(ref)]
    pub package_path: String,
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        salsa::plumbing::AsId::as_id(self).cmp(&salsa::plumbing::AsId::as_id(other))
    }
}

/// One node of the metadata graph (spec's "Metadata Graph" entity).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub package_id: PackageId,
    pub module_path: String,
    pub compiled_sources: Vec<File>,
    pub non_compiled_sources: Vec<File>,
    /// import-path -> imported package, forward edges only; reverse edges are
    /// derived on demand by [`MetadataGraphInput::reverse_dependencies`].
    pub imports: BTreeMap<String, PackageId>,
    pub loader_diagnostics: Vec<String>,
    pub is_test: bool,
    pub test_of: Option<PackageId>,
}

impl Metadata {
    #[must_use]
    pub fn sources(&self) -> impl Iterator<Item = &File> {
        self.compiled_sources.iter().chain(&self.non_compiled_sources)
    }
}

/// The full per-view metadata graph.
///
/// A salsa input rather than a tracked computation: loading it is an
/// external, side-effecting operation (the build-info collaborator call in
/// `modlsp-pipeline`), not a pure function of other salsa state. Replacing it
/// wholesale bumps the salsa revision and invalidates every downstream query
/// that read the previous graph.
#[salsa::input]
pub struct MetadataGraphInput {
    #[returns(ref)]
    pub packages: BTreeMap<PackageId, Metadata>,
}

impl MetadataGraphInput {
    #[must_use]
    pub fn get(self, db: &dyn Db, package_id: PackageId) -> Option<Metadata> {
        self.packages(db).get(&package_id).cloned()
    }

    /// Transitive reverse dependencies of `package_id`.
    #[must_use]
    pub fn reverse_dependencies(self, db: &dyn Db, package_id: PackageId) -> BTreeSet<PackageId> {
        let packages = self.packages(db);
        let mut seen = BTreeSet::new();
        let mut frontier = vec![package_id];

        while let Some(target) = frontier.pop() {
            for (candidate_id, candidate) in packages {
                if candidate.imports.values().any(|imported| *imported == target)
                    && seen.insert(*candidate_id)
                {
                    frontier.push(*candidate_id);
                }
            }
        }

        seen
    }

    /// Every package (including test variants) that compiles `path`.
    #[must_use]
    pub fn packages_for_file(self, db: &dyn Db, path: &Utf8Path) -> BTreeSet<PackageId> {
        self.packages(db)
            .values()
            .filter(|metadata| metadata.sources().any(|file| file.path(db) == path))
            .map(|metadata| metadata.package_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modlsp_source::InMemoryFileSystem;

    use super::*;
    use crate::db::SnapshotDatabase;
    use crate::db::Db as SnapshotDb;

    fn package(db: &SnapshotDatabase, path: &str) -> (PackageId, Metadata) {
        let id = PackageId::new(db, path.to_string());
        let metadata = Metadata {
            package_id: id,
            module_path: path.to_string(),
            compiled_sources: vec![db.file(camino::Utf8Path::new(path))],
            non_compiled_sources: vec![],
            imports: BTreeMap::new(),
            loader_diagnostics: vec![],
            is_test: false,
            test_of: None,
        };
        (id, metadata)
    }

    #[test]
    fn reverse_dependencies_are_transitive() {
        let db = SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()));

        let (a_id, a) = package(&db, "a.src");
        let (b_id, mut b) = package(&db, "b.src");
        b.imports.insert("a".to_string(), a_id);
        let (c_id, mut c) = package(&db, "c.src");
        c.imports.insert("b".to_string(), b_id);

        let mut packages = BTreeMap::new();
        packages.insert(a_id, a);
        packages.insert(b_id, b);
        packages.insert(c_id, c);

        let graph = MetadataGraphInput::new(&db, packages);
        let reverse = graph.reverse_dependencies(&db, a_id);

        assert!(reverse.contains(&b_id));
        assert!(reverse.contains(&c_id));
    }

    #[test]
    fn packages_for_file_finds_owning_package() {
        let db = SnapshotDatabase::for_tests(Arc::new(InMemoryFileSystem::new()));
        let (id, metadata) = package(&db, "lib.src");

        let mut packages = BTreeMap::new();
        packages.insert(id, metadata);
        let graph = MetadataGraphInput::new(&db, packages);

        let owners = graph.packages_for_file(&db, camino::Utf8Path::new("lib.src"));
        assert_eq!(owners, BTreeSet::from([id]));

        let none = graph.packages_for_file(&db, camino::Utf8Path::new("other.src"));
        assert!(none.is_empty());
    }
}
