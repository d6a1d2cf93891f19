mod cancel;
mod collections;
mod db;
mod file;
mod path;
mod position;
mod render;
mod span;
mod system;

pub use cancel::CancellationToken;
pub use collections::FxDashMap;
pub use collections::FxDashSet;
pub use db::Db;
pub use file::File;
pub use file::FileEncoding;
pub use file::SourceText;
pub use path::safe_join;
pub use path::SafeJoinError;
pub use path::Utf8PathClean;
pub use position::ByteOffset;
pub use position::LineCol;
pub use position::LineIndex;
pub use position::PositionEncoding;
pub use render::Diagnostic;
pub use render::DiagnosticAnnotation;
pub use render::Severity;
pub use span::Span;
pub use system::FileSystem;
pub use system::InMemoryFileSystem;
pub use system::OsFileSystem;
