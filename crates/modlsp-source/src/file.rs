use std::ops::Deref;
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::db::Db;
use crate::position::LineIndex;

/// A source file tracked by the salsa database.
///
/// [`File`] is a salsa input: its `path` and `revision` are set by the layer
/// that owns ingestion (the VFS in `modlsp-fs`), and every other query in the
/// workspace depends on it transitively through [`File::source`]. Bumping
/// `revision` without changing the text content still triggers a recompute of
/// `source`, but if the returned [`SourceText`] is equal to the previous one,
/// salsa backdates it and dependents are not re-executed.
#[salsa::input(debug)]
pub struct File {
    #[returns(ref)]
    pub path: Utf8PathBuf,
    /// Monotonically increasing per-file counter, bumped on every edit.
    pub revision: u64,
}

#[salsa::tracked]
impl File {
    #[salsa::tracked]
    pub fn source(self, db: &dyn Db) -> SourceText {
        let _ = self.revision(db);
        let path = self.path(db);
        let source = db.read_file_source(path).unwrap_or_default();
        SourceText::new(source)
    }

    #[salsa::tracked(returns(ref))]
    pub fn line_index(self, db: &dyn Db) -> LineIndex {
        LineIndex::from_text(self.source(db).as_str())
    }
}

/// Owned, reference-counted text content of a [`File`].
///
/// Cheap to clone (`Arc` internally) and compared by value so salsa can
/// backdate unchanged recomputations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText(Arc<SourceTextInner>);

impl SourceText {
    #[must_use]
    pub fn new(source: String) -> Self {
        let encoding = if source.is_ascii() {
            FileEncoding::Ascii
        } else {
            FileEncoding::Utf8
        };
        Self(Arc::new(SourceTextInner { encoding, source }))
    }

    #[must_use]
    pub fn encoding(&self) -> FileEncoding {
        self.0.encoding
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0.source
    }
}

impl Default for SourceText {
    fn default() -> Self {
        Self(Arc::new(SourceTextInner {
            encoding: FileEncoding::Ascii,
            source: String::new(),
        }))
    }
}

impl AsRef<str> for SourceText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for SourceText {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceTextInner {
    encoding: FileEncoding,
    source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileEncoding {
    Ascii,
    Utf8,
}
