//! Concrete Salsa database for the Snapshot Engine.
//!
//! One [`SnapshotDatabase`] instance serves exactly one [`View`]: its `view`
//! field is immutable for the database's lifetime, matching the data model's
//! "env is immutable; a change of env => a new view". `modlsp-session` owns
//! the registry that maps live views to their databases and creates/drops
//! instances as the view plan is reconciled.

use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use modlsp_conf::Settings;
use modlsp_source::File;
use modlsp_source::FxDashMap;
use modlsp_views::View;

use crate::metadata::MetadataGraphInput;
use crate::parse::ParsedFileCache;

/// Database trait implemented by [`SnapshotDatabase`], depended on by
/// `modlsp-pipeline` to reach the file registry and the view it is computing
/// metadata/typed-packages for.
#[salsa::db]
pub trait Db: modlsp_source::Db {
    fn file(&self, path: &Utf8Path) -> File;
    fn get_file(&self, path: &Utf8Path) -> Option<File>;
    fn view(&self) -> &View;
    fn metadata_graph(&self) -> Option<MetadataGraphInput>;
    fn set_metadata_graph(&mut self, graph: MetadataGraphInput);
}

#[salsa::db]
#[derive(Clone)]
pub struct SnapshotDatabase {
    /// Overlay-aware file system (checks open buffers before disk).
    pub(crate) fs: Arc<dyn modlsp_source::FileSystem>,

    /// Registry of every [`File`] salsa input this view has ever touched.
    pub(crate) files: Arc<FxDashMap<Utf8PathBuf, File>>,

    /// The view this database is the snapshot engine for.
    pub(crate) view: View,

    /// Settings currently in effect, compared field-by-field before
    /// overwriting so an unrelated settings change doesn't invalidate
    /// queries that don't depend on the part that changed.
    pub(crate) settings: Arc<Mutex<Settings>>,

    /// The package metadata graph once the Package Pipeline has loaded it.
    /// `None` until the first `metadata`/`reverse_dependencies` request.
    pub(crate) metadata_graph: Arc<Mutex<Option<MetadataGraphInput>>>,

    /// Content-addressed parse cache, shared across every snapshot cloned
    /// from this database.
    pub(crate) parsed_files: Arc<ParsedFileCache>,

    pub(crate) storage: salsa::Storage<Self>,

    // Only used for testing and demonstrating salsa cache reuse.
    #[cfg(test)]
    #[allow(dead_code)]
    pub(crate) logs: Arc<Mutex<Option<Vec<String>>>>,
}

impl SnapshotDatabase {
    #[must_use]
    pub fn new(fs: Arc<dyn modlsp_source::FileSystem>, view: View, settings: Settings) -> Self {
        Self {
            fs,
            files: Arc::new(FxDashMap::default()),
            view,
            settings: Arc::new(Mutex::new(settings)),
            metadata_graph: Arc::new(Mutex::new(None)),
            parsed_files: Arc::new(ParsedFileCache::new()),
            storage: salsa::Storage::new(None),
            #[cfg(test)]
            logs: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn for_tests(fs: Arc<dyn modlsp_source::FileSystem>) -> Self {
        Self::new(
            fs,
            View::ad_hoc(Utf8PathBuf::from("/test")),
            Settings::default(),
        )
    }

    #[must_use]
    pub fn parsed_files(&self) -> &ParsedFileCache {
        &self.parsed_files
    }

    /// Start a new generation of the parse cache and evict entries from
    /// generations older than `keep_within`, biased to keep entries the
    /// caller marks as still reachable (open files).
    pub fn advance_generation(&self, keep_within: u64, pinned_hashes: &[u64]) -> u64 {
        let generation = self.parsed_files.advance_generation();
        self.parsed_files
            .evict_older_than(keep_within.min(generation));
        let _ = pinned_hashes; // reserved for a future by-hash pin list
        generation
    }
}

#[salsa::db]
impl salsa::Database for SnapshotDatabase {}

#[salsa::db]
impl modlsp_source::Db for SnapshotDatabase {
    fn read_file_source(&self, path: &Utf8Path) -> Option<String> {
        self.fs.read_to_string(path).ok()
    }
}

#[salsa::db]
impl Db for SnapshotDatabase {
    fn file(&self, path: &Utf8Path) -> File {
        if let Some(file) = self.files.get(path) {
            return *file;
        }
        let file = File::new(self, path.to_owned(), 0);
        self.files.insert(path.to_owned(), file);
        file
    }

    fn get_file(&self, path: &Utf8Path) -> Option<File> {
        self.files.get(path).map(|entry| *entry)
    }

    fn view(&self) -> &View {
        &self.view
    }

    fn metadata_graph(&self) -> Option<MetadataGraphInput> {
        *self.metadata_graph.lock().unwrap()
    }

    fn set_metadata_graph(&mut self, graph: MetadataGraphInput) {
        *self.metadata_graph.lock().unwrap() = Some(graph);
    }
}

#[cfg(test)]
mod marker_tests {
    // SnapshotDatabase is intentionally !Sync -- salsa::Storage uses RefCell
    // internally. Cross-thread reads go through `salsa::Database::snapshot`
    // (see `crate::snapshot`), not `Sync`.

    #[test]
    fn db_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<crate::db::SnapshotDatabase>();
    }
}
