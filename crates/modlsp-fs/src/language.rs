//! Language identification for document routing
//!
//! Maps LSP language identifiers to the VFS's [`FileKind`] for analyzer
//! routing. Language IDs come from the LSP client (`textDocument/didOpen`).

use crate::vfs::FileKind;

/// Language identifier as reported by the LSP client.
///
/// Follows VS Code's language ID conventions and determines which analyzers
/// and features are available for a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LanguageId {
    /// Compiled module source.
    Module,
    /// A build manifest (module or workspace configuration).
    Manifest,
    PlainText,
    Other,
}

impl From<&str> for LanguageId {
    fn from(language_id: &str) -> Self {
        match language_id {
            "plaintext" => Self::PlainText,
            "toml" => Self::Manifest,
            _ => Self::Module,
        }
    }
}

impl From<String> for LanguageId {
    fn from(language_id: String) -> Self {
        Self::from(language_id.as_str())
    }
}

impl From<LanguageId> for FileKind {
    fn from(language_id: LanguageId) -> Self {
        match language_id {
            LanguageId::Module => Self::Module,
            LanguageId::Manifest => Self::Manifest,
            LanguageId::PlainText | LanguageId::Other => Self::Other,
        }
    }
}
