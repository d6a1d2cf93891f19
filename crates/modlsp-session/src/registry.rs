//! Owns the live view set and reconciles it against the View Definer's
//! discovery plan (spec §4.2, §4.5.3).
//!
//! Structural mutation -- creating or retiring a view -- is guarded by a
//! single mutex held only long enough to swap the view map; reading the
//! current [`Snapshot`] for a view never blocks on it, matching spec §5's
//! "view-set structural mutation guarded by a single mutex held only
//! briefly."

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use modlsp_fs::WorkspaceFileSystem;
use modlsp_pipeline::PipelineCaches;
use modlsp_snapshot::Db as SnapshotDb;
use modlsp_snapshot::SequenceCounter;
use modlsp_snapshot::Snapshot;
use modlsp_snapshot::SnapshotDatabase;
use modlsp_views::reconcile;
use modlsp_views::plan_views;
use modlsp_views::view_for_open_file;
use modlsp_views::View;
use modlsp_views::ViewDefinition;
use modlsp_views::ViewId;
use salsa::Setter;

/// Everything the dispatcher keeps per live view: its database, the
/// sequence counter that stamps new snapshots, the pipeline's memoization
/// caches, and a serialization queue for state-changing notifications
/// (spec §4.5.2 -- "serialized within one view; parallel across views").
pub struct LiveView {
    pub view: View,
    pub db: Mutex<SnapshotDatabase>,
    pub sequence: SequenceCounter,
    pub pipeline_caches: PipelineCaches,
    pub queue: crate::queue::Queue,
    file_revisions: AtomicU64,
}

impl LiveView {
    fn new(view: View, fs: Arc<WorkspaceFileSystem>, settings: modlsp_conf::Settings) -> Self {
        let fs: Arc<dyn modlsp_source::FileSystem> = fs;
        let db = SnapshotDatabase::new(fs, view.clone(), settings);
        Self {
            view,
            db: Mutex::new(db),
            sequence: SequenceCounter::default(),
            pipeline_caches: PipelineCaches::new(),
            queue: crate::queue::Queue::new(),
            file_revisions: AtomicU64::new(0),
        }
    }

    /// `acquire()`: pin the current snapshot for a request's duration
    /// (spec §4.5.1). Cloning `SnapshotDatabase` is cheap -- every field is
    /// `Arc`-backed -- so this never blocks behind `db`'s lock for longer
    /// than the clone itself.
    #[must_use]
    pub fn acquire(&self) -> Snapshot {
        let db = self.db.lock().unwrap().clone();
        Snapshot::initial(&db, &self.sequence)
    }

    /// Marks `path`'s salsa input as edited so every query derived from it
    /// -- parse, metadata, type-check -- recomputes on the next snapshot
    /// that observes it. The VFS overlay (`modlsp-fs`) already holds the new
    /// text; this only bumps the revision `File::source` depends on.
    pub fn bump_file(&self, path: &Utf8Path) {
        let revision = self.file_revisions.fetch_add(1, Ordering::AcqRel) + 1;
        let mut db = self.db.lock().unwrap();
        let file = db.file(path);
        file.set_revision(&mut *db).to(revision);
    }
}

/// The set of live views plus the last-planned definitions, reconciled on
/// every configuration change or workspace-folder change (spec §4.5.3).
pub struct ViewRegistry {
    fs: Arc<WorkspaceFileSystem>,
    module_marker: String,
    multi_module_marker: String,
    structural: Mutex<BTreeMap<ViewId, Arc<LiveView>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl ViewRegistry {
    #[must_use]
    pub fn new(fs: Arc<WorkspaceFileSystem>, module_marker: &str, multi_module_marker: &str) -> Self {
        Self {
            fs,
            module_marker: module_marker.to_string(),
            multi_module_marker: multi_module_marker.to_string(),
            structural: Mutex::new(BTreeMap::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn views(&self) -> Vec<Arc<LiveView>> {
        self.structural.lock().unwrap().values().cloned().collect()
    }

    /// Discover build roots under `folders` and reconcile against the live
    /// set, creating and retiring views as needed. Returns the ids retired
    /// so the caller can cancel any outstanding work for them.
    pub fn reconcile_folders(
        &self,
        folders: &[Utf8PathBuf],
        settings: &modlsp_conf::Settings,
    ) -> Vec<ViewId> {
        let planned = plan_views(folders, &self.module_marker, &self.multi_module_marker);
        self.reconcile_definitions(&planned, settings)
    }

    fn reconcile_definitions(
        &self,
        planned: &[ViewDefinition],
        settings: &modlsp_conf::Settings,
    ) -> Vec<ViewId> {
        let mut structural = self.structural.lock().unwrap();
        let existing: Vec<View> = structural.values().map(|live| live.view.clone()).collect();
        let result = reconcile(&existing, planned);

        let mut retired_ids = Vec::new();
        for retired_view in &result.retired {
            structural.remove(&retired_view.id);
            retired_ids.push(retired_view.id);
        }

        for definition in result.created {
            let id = ViewId::from_raw(self.next_id.fetch_add(1, std::sync::atomic::Ordering::AcqRel));
            let view = View::new(id, definition);
            let live = Arc::new(LiveView::new(view, Arc::clone(&self.fs), settings.clone()));
            structural.insert(id, live);
        }

        retired_ids
    }

    /// `view_for_open_file`: find the live view covering `path`, creating an
    /// ad hoc or no-module fallback view if none does (spec §4.2).
    pub fn view_for_file(
        &self,
        path: &Utf8Path,
        is_source_file: bool,
        settings: &modlsp_conf::Settings,
    ) -> Arc<LiveView> {
        {
            let structural = self.structural.lock().unwrap();
            let existing: Vec<View> = structural.values().map(|live| live.view.clone()).collect();
            if let Some(found) = view_for_open_file(path, &existing) {
                return Arc::clone(&structural[&found.id]);
            }
        }

        let definition = modlsp_views::fallback_definition_for(path, is_source_file);
        let mut structural = self.structural.lock().unwrap();
        // Re-check: another caller may have created the exact same fallback
        // view definition while we didn't hold the lock.
        for live in structural.values() {
            if live.view.definition == definition {
                return Arc::clone(live);
            }
        }

        let id = ViewId::from_raw(self.next_id.fetch_add(1, std::sync::atomic::Ordering::AcqRel));
        let view = View::new(id, definition);
        let live = Arc::new(LiveView::new(view, Arc::clone(&self.fs), settings.clone()));
        structural.insert(id, Arc::clone(&live));
        live
    }

    #[must_use]
    pub fn get(&self, id: ViewId) -> Option<Arc<LiveView>> {
        self.structural.lock().unwrap().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlsp_fs::Buffers;
    use modlsp_source::InMemoryFileSystem;

    fn registry() -> ViewRegistry {
        let fs = Arc::new(WorkspaceFileSystem::new(Buffers::new(), Arc::new(InMemoryFileSystem::new())));
        ViewRegistry::new(fs, "module.toml", "workspace.toml")
    }

    #[test]
    fn reconcile_is_idempotent_for_an_unchanged_plan() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(root.join("module.toml"), "").unwrap();

        let registry = registry();
        let settings = modlsp_conf::Settings::default();
        registry.reconcile_folders(std::slice::from_ref(&root), &settings);
        assert_eq!(registry.views().len(), 1);

        registry.reconcile_folders(std::slice::from_ref(&root), &settings);
        assert_eq!(registry.views().len(), 1);
    }

    #[test]
    fn a_file_outside_any_root_gets_an_ad_hoc_view() {
        let registry = registry();
        let settings = modlsp_conf::Settings::default();
        let live = registry.view_for_file(Utf8Path::new("/scratch/a.src"), true, &settings);
        assert_eq!(live.view.view_type(), modlsp_views::ViewType::AdHoc);
        assert_eq!(registry.views().len(), 1);

        let again = registry.view_for_file(Utf8Path::new("/scratch/a.src"), true, &settings);
        assert_eq!(again.view.id, live.view.id);
    }

    #[test]
    fn bumping_a_file_changes_its_salsa_revision() {
        let registry = registry();
        let settings = modlsp_conf::Settings::default();
        let path = Utf8Path::new("/scratch/a.src");
        let live = registry.view_for_file(path, true, &settings);

        let before = {
            let db = live.db.lock().unwrap();
            db.file(path).revision(&*db)
        };

        live.bump_file(path);

        let after = {
            let db = live.db.lock().unwrap();
            db.file(path).revision(&*db)
        };

        assert!(after > before);
    }
}
