//! Change-tracked, concurrent virtual file system keyed by [`FileId`].
//!
//! Every read returns a handle whose identity is derived from
//! `(source, version, content-hash)`.
//! Two handles with equal identity carry equal content, so downstream
//! caches can use identity as a key without re-hashing content.
//!
//! Overlays (editor buffers) always take precedence over disk content; the
//! VFS never fails a read outright — a missing or unreadable disk file
//! produces a record with an error recorded on it.

use anyhow::{anyhow, Result};
use camino::Utf8PathBuf;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};
use url::Url;

use crate::watcher::{VfsWatcher, WatchConfig, WatchEvent};

/// Stable, compact identifier for files across the subsystem.
///
/// Decouples file identity from paths/URIs, giving maps and salsa inputs a
/// cheap key. Once assigned to a URI, an id remains stable for the lifetime
/// of the process.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(u32);

impl FileId {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        FileId(raw)
    }

    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Monotonic counter representing global VFS state.
///
/// [`Revision`] increments whenever file content changes occur in the VFS.
/// This provides a cheap way to detect if any changes have occurred since
/// a previous snapshot was taken.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Revision(u64);

impl Revision {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Revision(raw)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// File classification at the VFS layer, used to route files to the right
/// parser/metadata handling without inspecting content.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FileKind {
    /// Compiled source belonging to a module.
    Module,
    /// A build-configuration / manifest file (module or workspace marker).
    Manifest,
    /// Anything else tracked for completeness.
    Other,
}

impl FileKind {
    #[must_use]
    pub fn from_path(path: &camino::Utf8Path) -> Self {
        match path.file_name() {
            Some("module.toml" | "workspace.toml") => FileKind::Manifest,
            _ => match path.extension() {
                Some("src" | "rs") => FileKind::Module,
                _ => FileKind::Other,
            },
        }
    }
}

/// Metadata associated with a file in the VFS.
#[derive(Clone, Debug)]
pub struct FileMeta {
    pub uri: Url,
    pub path: Utf8PathBuf,
    pub kind: FileKind,
}

/// Source of text content in the VFS: an editor overlay, or disk.
#[derive(Clone)]
pub enum TextSource {
    /// Content loaded from disk; carries a generation nonce since disk
    /// files have no natural version number.
    Disk { text: Arc<str>, nonce: u64 },
    /// Content from an LSP client overlay (`didOpen`/`didChange`). Versions
    /// are client-supplied and must be monotonically nondecreasing per URI.
    Overlay { text: Arc<str>, version: i32 },
}

impl TextSource {
    fn text(&self) -> &Arc<str> {
        match self {
            TextSource::Disk { text, .. } | TextSource::Overlay { text, .. } => text,
        }
    }
}

/// Complete record of a file in the VFS: metadata, content, and the
/// content-hash half of its identity.
#[derive(Clone)]
pub struct FileRecord {
    pub meta: FileMeta,
    pub text: TextSource,
    pub hash: u64,
    /// Set when the most recent disk read failed; surfaced as a diagnostic
    /// by consumers rather than as a VFS error.
    pub read_error: Option<String>,
}

/// Thread-safe virtual file system with change tracking.
///
/// Uses `DashMap` for lock-free concurrent access and atomic counters for
/// stable id/revision assignment.
pub struct Vfs {
    next_file_id: AtomicU32,
    by_uri: DashMap<Url, FileId>,
    by_path: DashMap<Utf8PathBuf, FileId>,
    files: DashMap<FileId, FileRecord>,
    head: AtomicU64,
    disk_nonce: AtomicU64,
    watcher: std::sync::Mutex<Option<VfsWatcher>>,
}

impl Vfs {
    /// Get or create a [`FileId`] for the given URI, reading its initial
    /// content from disk. Returns the existing id if the URI is already
    /// known.
    pub fn intern_file(&self, uri: Url, path: Utf8PathBuf, kind: FileKind) -> FileId {
        if let Some(id) = self.by_uri.get(&uri).map(|entry| *entry) {
            return id;
        }
        let id = FileId(self.next_file_id.fetch_add(1, Ordering::SeqCst));
        let (text, read_error) = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => (Arc::from(content.as_str()), None),
            Err(e) => (Arc::from(""), Some(e.to_string())),
        };
        let nonce = self.disk_nonce.fetch_add(1, Ordering::SeqCst);
        let source = TextSource::Disk { text, nonce };
        let hash = content_hash(&source);
        let meta = FileMeta {
            uri: uri.clone(),
            path: path.clone(),
            kind,
        };
        self.by_uri.insert(uri, id);
        self.by_path.insert(path, id);
        self.files.insert(
            id,
            FileRecord {
                meta,
                text: source,
                hash,
                read_error,
            },
        );
        id
    }

    /// Set overlay text for a file, typically from LSP `didChange` events.
    ///
    /// Overlay versions must be monotonically nondecreasing per URI; a
    /// stale version is rejected rather than silently applied. Only
    /// increments the global revision if content actually changed (detected
    /// via hash comparison). Returns `(new global revision, content
    /// changed)`.
    pub fn set_overlay(&self, id: FileId, version: i32, new_text: Arc<str>) -> Result<(Revision, bool)> {
        let mut rec = self
            .files
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown file: {:?}", id))?;

        if let TextSource::Overlay {
            version: current, ..
        } = &rec.text
        {
            if version < *current {
                return Err(anyhow!(
                    "overlay version went backwards: {version} < {current}"
                ));
            }
        }

        let next = TextSource::Overlay {
            text: new_text,
            version,
        };
        let new_hash = content_hash(&next);
        let changed = new_hash != rec.hash;
        if changed {
            rec.text = next;
            rec.hash = new_hash;
            rec.read_error = None;
            self.head.fetch_add(1, Ordering::SeqCst);
        }
        Ok((
            Revision::from_raw(self.head.load(Ordering::SeqCst)),
            changed,
        ))
    }

    /// Drop the overlay for a file, reverting subsequent reads to disk.
    pub fn clear_overlay(&self, id: FileId) -> Result<Revision> {
        let path = {
            let rec = self
                .files
                .get(&id)
                .ok_or_else(|| anyhow!("unknown file: {:?}", id))?;
            rec.meta.path.clone()
        };
        self.force_reload_from_disk(&path);
        Ok(Revision::from_raw(self.head.load(Ordering::SeqCst)))
    }

    /// Create an immutable snapshot of the current VFS state.
    ///
    /// Materializes a consistent view of all files for downstream
    /// consumers. Relatively cheap due to `Arc` sharing of text content.
    #[must_use]
    pub fn snapshot(&self) -> VfsSnapshot {
        VfsSnapshot {
            revision: Revision::from_raw(self.head.load(Ordering::SeqCst)),
            files: self
                .files
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }

    /// Enable file system watching with the given configuration.
    pub fn enable_file_watching(&self, config: WatchConfig) -> Result<()> {
        let watcher = VfsWatcher::new(config)?;
        *self
            .watcher
            .lock()
            .map_err(|e| anyhow!("Failed to lock watcher mutex: {}", e))? = Some(watcher);
        Ok(())
    }

    /// Process pending file system events from the watcher.
    ///
    /// Should be called periodically to sync external file changes into the
    /// VFS. Returns the number of files that were updated. Deletions are
    /// recorded as read errors rather than removed, preserving stable
    /// [`FileId`]s for consumers.
    pub fn process_file_events(&self) -> usize {
        let events = {
            let Ok(guard) = self.watcher.lock() else {
                return 0;
            };
            if let Some(watcher) = guard.as_ref() {
                watcher.try_recv_events()
            } else {
                return 0;
            }
        };

        let mut updated_count = 0;
        for event in events {
            match event {
                WatchEvent::Modified(path) | WatchEvent::Created(path) => {
                    if self.load_from_disk_if_tracked(&path) {
                        updated_count += 1;
                    }
                }
                WatchEvent::Deleted(path) => {
                    if let Some(id) = self.by_path.get(&path).map(|entry| *entry) {
                        if let Some(mut rec) = self.files.get_mut(&id) {
                            rec.read_error = Some(format!("{path}: no such file or directory"));
                            self.head.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
                WatchEvent::Renamed { from, to } => {
                    if let Some((_, id)) = self.by_path.remove(&from) {
                        self.by_path.insert(to.clone(), id);
                        self.force_reload_from_disk(&to);
                    }
                }
            }
        }
        updated_count
    }

    /// Re-read disk content for a tracked, non-overlaid file. Returns
    /// whether anything changed.
    fn load_from_disk_if_tracked(&self, path: &Utf8PathBuf) -> bool {
        let Some(id) = self.by_path.get(path).map(|entry| *entry) else {
            return false;
        };
        let Some(mut rec) = self.files.get_mut(&id) else {
            return false;
        };
        // An overlay still shadows disk; the change is picked up once the
        // overlay is closed.
        if matches!(rec.text, TextSource::Overlay { .. }) {
            return false;
        }
        match fs::read_to_string(path.as_std_path()) {
            Ok(content) => {
                let nonce = self.disk_nonce.fetch_add(1, Ordering::SeqCst);
                let next = TextSource::Disk {
                    text: Arc::from(content.as_str()),
                    nonce,
                };
                let new_hash = content_hash(&next);
                if new_hash != rec.hash {
                    rec.text = next;
                    rec.hash = new_hash;
                    rec.read_error = None;
                    self.head.fetch_add(1, Ordering::SeqCst);
                    return true;
                }
                false
            }
            Err(e) => {
                rec.read_error = Some(e.to_string());
                self.head.fetch_add(1, Ordering::SeqCst);
                true
            }
        }
    }

    fn force_reload_from_disk(&self, path: &Utf8PathBuf) {
        let Some(id) = self.by_path.get(path).map(|entry| *entry) else {
            return;
        };
        let Some(mut rec) = self.files.get_mut(&id) else {
            return;
        };
        match fs::read_to_string(path.as_std_path()) {
            Ok(content) => {
                let nonce = self.disk_nonce.fetch_add(1, Ordering::SeqCst);
                rec.text = TextSource::Disk {
                    text: Arc::from(content.as_str()),
                    nonce,
                };
                rec.hash = content_hash(&rec.text);
                rec.read_error = None;
            }
            Err(e) => {
                let nonce = self.disk_nonce.fetch_add(1, Ordering::SeqCst);
                rec.text = TextSource::Disk {
                    text: Arc::from(""),
                    nonce,
                };
                rec.read_error = Some(e.to_string());
            }
        }
        self.head.fetch_add(1, Ordering::SeqCst);
    }

    /// Check if file watching is currently enabled.
    #[must_use]
    pub fn is_file_watching_enabled(&self) -> bool {
        self.watcher.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self {
            next_file_id: AtomicU32::new(0),
            by_uri: DashMap::new(),
            by_path: DashMap::new(),
            files: DashMap::new(),
            head: AtomicU64::new(0),
            disk_nonce: AtomicU64::new(0),
            watcher: std::sync::Mutex::new(None),
        }
    }
}

/// Compute a stable hash over file content.
///
/// Used for efficient change detection - if the hash hasn't changed, the
/// content hasn't changed, avoiding unnecessary snapshot invalidations.
fn content_hash(src: &TextSource) -> u64 {
    let mut h = DefaultHasher::new();
    src.text().hash(&mut h);
    h.finish()
}

/// Immutable snapshot view of the VFS at a specific revision.
///
/// Provides a consistent view of all files for downstream consumers,
/// avoiding the need for locking during processing.
#[derive(Clone)]
pub struct VfsSnapshot {
    pub revision: Revision,
    pub files: HashMap<FileId, FileRecord>,
}

impl VfsSnapshot {
    #[must_use]
    pub fn get_text(&self, id: FileId) -> Option<Arc<str>> {
        self.files.get(&id).map(|r| r.text.text().clone())
    }

    #[must_use]
    pub fn get_error(&self, id: FileId) -> Option<&str> {
        self.files.get(&id).and_then(|r| r.read_error.as_deref())
    }

    #[must_use]
    pub fn meta(&self, id: FileId) -> Option<&FileMeta> {
        self.files.get(&id).map(|r| &r.meta)
    }

    /// The handle identity for a file: `(is_overlay, version_or_nonce,
    /// content-hash)`. Equal identities for the same id are guaranteed to
    /// carry equal content.
    #[must_use]
    pub fn identity(&self, id: FileId) -> Option<(bool, i64, u64)> {
        self.files.get(&id).map(|r| match &r.text {
            TextSource::Overlay { version, .. } => (true, i64::from(*version), r.hash),
            TextSource::Disk { nonce, .. } => {
                (false, i64::try_from(*nonce).unwrap_or(i64::MAX), r.hash)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfs_with_file(content: &str) -> (Vfs, FileId, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a.src")).unwrap();
        fs::write(&path, content).unwrap();
        let uri = Url::from_file_path(path.as_std_path()).unwrap();
        let vfs = Vfs::default();
        let id = vfs.intern_file(uri, path, FileKind::Module);
        (vfs, id, dir)
    }

    #[test]
    fn overlay_takes_precedence_over_disk() {
        let (vfs, id, _dir) = vfs_with_file("on disk");
        assert_eq!(vfs.snapshot().get_text(id).unwrap().as_ref(), "on disk");

        vfs.set_overlay(id, 1, Arc::from("in editor")).unwrap();
        assert_eq!(vfs.snapshot().get_text(id).unwrap().as_ref(), "in editor");
    }

    #[test]
    fn stale_overlay_version_is_rejected() {
        let (vfs, id, _dir) = vfs_with_file("x");
        vfs.set_overlay(id, 5, Arc::from("v5")).unwrap();
        assert!(vfs.set_overlay(id, 3, Arc::from("v3")).is_err());
    }

    #[test]
    fn identical_content_does_not_bump_revision() {
        let (vfs, id, _dir) = vfs_with_file("x");
        let (_, changed) = vfs.set_overlay(id, 1, Arc::from("x")).unwrap();
        assert!(!changed);
    }

    #[test]
    fn revision_advances_on_real_change() {
        let (vfs, id, _dir) = vfs_with_file("x");
        let before = vfs.snapshot().revision;
        vfs.set_overlay(id, 1, Arc::from("y")).unwrap();
        let after = vfs.snapshot().revision;
        assert!(after > before);
    }

    #[test]
    fn clear_overlay_reverts_to_disk() {
        let (vfs, id, _dir) = vfs_with_file("on disk");
        vfs.set_overlay(id, 1, Arc::from("in editor")).unwrap();
        vfs.clear_overlay(id).unwrap();
        assert_eq!(vfs.snapshot().get_text(id).unwrap().as_ref(), "on disk");
    }
}
