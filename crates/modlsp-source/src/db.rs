use camino::Utf8Path;

/// Salsa database trait implemented by every crate that needs to resolve
/// [`crate::File`] contents.
///
/// Kept deliberately minimal: the only thing every layer needs from "the
/// database" is a way to turn a path into source text. Concrete databases
/// (see `modlsp-fs`, `modlsp-snapshot`) layer overlay/disk precedence, VFS
/// lookups, and salsa input registration on top of this.
#[salsa::db]
pub trait Db: salsa::Database {
    fn read_file_source(&self, path: &Utf8Path) -> Option<String>;
}
