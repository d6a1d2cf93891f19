//! The Snapshot Engine: maintains the immutable, versioned view of a view's
//! world and answers "give me the current derived artifact X" efficiently,
//! reusing cached results whenever the inputs they depend on haven't
//! actually changed.

mod cache;
mod db;
mod metadata;
mod parse;
mod settings;
mod snapshot;
mod storage;

pub use db::Db;
pub use db::SnapshotDatabase;
pub use metadata::Metadata;
pub use metadata::MetadataGraphInput;
pub use metadata::PackageId;
pub use parse::Declaration;
pub use parse::ParseError;
pub use parse::ParseMode;
pub use parse::ParsedFile;
pub use parse::ParsedFileCache;
pub use settings::SettingsUpdate;
pub use snapshot::SequenceCounter;
pub use snapshot::Snapshot;
pub use snapshot::SymbolMatch;
pub use storage::SafeStorageHandle;
pub use storage::StorageHandleGuard;
