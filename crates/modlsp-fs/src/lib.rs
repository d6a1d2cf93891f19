//! File Source (FS): the content-addressed overlay over the real filesystem.
//!
//! This crate is the single source of truth for "what are the bytes of file
//! U right now, and what version of those bytes is it?" Editors push unsaved
//! buffer content through [`Buffers`]; a [`watcher`] delivers on-disk change
//! notifications. The [`vfs`] module turns both into stable, identity-bearing
//! file handles that downstream snapshot/pipeline code can use as cache keys
//! without re-comparing content.
//!
//! # Key components
//!
//! - [`Buffers`] - thread-safe storage for open document overlays
//! - [`vfs::Vfs`] - content-addressed handle store with overlay precedence
//! - [`TextDocument`] - LSP document representation with UTF-16-aware indexing
//! - [`FileSystem`] - overlay-then-disk file I/O abstraction
//! - [`paths`] - URI/path conversion utilities

mod buffers;
mod document;
mod encoding;
mod fs;
mod language;
pub mod paths;
pub mod vfs;
pub mod walk;
pub mod watcher;

pub use buffers::Buffers;
pub use document::LineIndex;
pub use document::TextDocument;
pub use encoding::negotiate_position_encoding;
pub use encoding::position_encoding_from_lsp;
pub use encoding::position_encoding_to_lsp;
pub use fs::OsFileSystem;
pub use fs::WorkspaceFileSystem;
pub use language::LanguageId;
pub use modlsp_source::FileSystem;
pub use vfs::FileId;
pub use vfs::FileKind;
pub use vfs::Vfs;
pub use vfs::VfsSnapshot;
