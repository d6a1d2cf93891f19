//! The overlay-over-disk [`FileSystem`](modlsp_source::FileSystem) used by
//! the rest of the server.
//!
//! [`WorkspaceFileSystem`] implements a two-layer read: an open [`Buffers`]
//! entry always wins, falling back to a real (or, in tests, in-memory) disk
//! read -- an open buffer's in-editor content always takes precedence over
//! whatever is currently on disk.

use std::io;
use std::sync::Arc;

use camino::Utf8Path;
use modlsp_source::FileSystem;

use crate::buffers::Buffers;
use crate::paths;

pub use modlsp_source::OsFileSystem;

/// Overlay-aware file system: open buffers shadow disk content.
pub struct WorkspaceFileSystem {
    buffers: Buffers,
    disk: Arc<dyn FileSystem>,
}

impl WorkspaceFileSystem {
    #[must_use]
    pub fn new(buffers: Buffers, disk: Arc<dyn FileSystem>) -> Self {
        Self { buffers, disk }
    }
}

impl FileSystem for WorkspaceFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        if let Some(url) = paths::path_to_url(path) {
            if let Some(document) = self.buffers.get(&url) {
                return Ok(document.content().to_string());
            }
        }
        self.disk.read_to_string(path)
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        paths::path_to_url(path).is_some_and(|url| self.buffers.contains(&url))
            || self.disk.exists(path)
    }
}
