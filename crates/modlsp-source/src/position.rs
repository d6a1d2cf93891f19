use serde::Serialize;

/// The unit the LSP client wants `Position.character` expressed in,
/// negotiated once at `initialize` time (spec §6.1: "the server preserves
/// client-chosen positions in UTF-16 code units" unless the client opts
/// into something cheaper to compute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionEncoding {
    Utf8,
    Utf16,
    Utf32,
}

impl Default for PositionEncoding {
    fn default() -> Self {
        Self::Utf16
    }
}

/// A byte offset within a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ByteOffset(pub u32);

/// A zero-based line and UTF-16-agnostic column position within a document.
///
/// Conversion to LSP's UTF-16 columns happens at the session boundary, not
/// here — this type stays in byte-offset terms so it composes with [`Span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol(pub (u32, u32));

impl LineCol {
    #[must_use]
    pub fn line(&self) -> u32 {
        self.0 .0
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.0 .1
    }
}

/// Precomputed line-start offsets for a document, used to convert byte
/// offsets to line/column pairs in O(log n).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex(Vec<u32>);

impl LineIndex {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut starts = Vec::with_capacity(256);
        starts.push(0);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(u32::try_from(i).unwrap_or(u32::MAX) + 1);
            }
        }
        LineIndex(starts)
    }

    #[must_use]
    pub fn to_line_col(&self, offset: ByteOffset) -> LineCol {
        if self.0.is_empty() {
            return LineCol((0, 0));
        }

        let line = match self.0.binary_search(&offset.0) {
            Ok(exact) => exact,
            Err(0) => 0,
            Err(next) => next - 1,
        };

        let line_start = self.0[line];
        let column = offset.0.saturating_sub(line_start);

        LineCol((u32::try_from(line).unwrap_or(u32::MAX), column))
    }

    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.0.get(line as usize).copied()
    }

    #[must_use]
    pub fn lines(&self) -> &[u32] {
        &self.0
    }
}
