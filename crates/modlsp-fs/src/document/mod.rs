//! In-memory representation of an open editor document.

mod line_index;

pub use line_index::LineIndex;
use tower_lsp_server::ls_types::Position;
use tower_lsp_server::ls_types::Range;

use crate::language::LanguageId;
use std::sync::Arc;

/// An open document tracked by [`Buffers`](crate::Buffers).
///
/// Owns its content directly (unlike disk-backed VFS records, which hold
/// content behind a shared `Arc`) so that `didChange` updates can replace it
/// without touching the rest of the overlay map.
#[derive(Clone, Debug)]
pub struct TextDocument {
    content: Arc<str>,
    version: i32,
    language_id: LanguageId,
    line_index: LineIndex,
}

impl TextDocument {
    #[must_use]
    pub fn new(content: String, version: i32, language_id: LanguageId) -> Self {
        let line_index = LineIndex::new(&content);
        Self {
            content: Arc::from(content.as_str()),
            version,
            language_id,
            line_index,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    #[must_use]
    pub fn get_line(&self, line: u32) -> Option<&str> {
        let start = *self.line_index.line_starts.get(line as usize)? as usize;
        let end = self
            .line_index
            .line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.line_index.length) as usize;
        Some(&self.content[start..end])
    }

    #[must_use]
    pub fn get_text_range(&self, range: Range) -> Option<&str> {
        let start = self.line_index.offset(range.start)? as usize;
        let end = self.line_index.offset(range.end)? as usize;
        Some(&self.content[start..end])
    }

    #[must_use]
    pub fn position_to_offset(&self, position: Position) -> Option<u32> {
        self.line_index.offset(position)
    }

    #[must_use]
    pub fn offset_to_position(&self, offset: u32) -> Position {
        self.line_index.position(offset)
    }

    pub fn update_content(&mut self, content: String) {
        self.line_index = LineIndex::new(&content);
        self.content = Arc::from(content.as_str());
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn language_id(&self) -> LanguageId {
        self.language_id.clone()
    }
}
