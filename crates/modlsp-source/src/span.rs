use serde::Serialize;

use crate::position::ByteOffset;
use crate::position::LineCol;
use crate::position::LineIndex;

/// A byte-offset range within a single [`crate::File`], the unit every
/// diagnostic, reference, and view-local location is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn start_offset(&self) -> ByteOffset {
        ByteOffset(self.start)
    }

    #[must_use]
    pub fn end_offset(&self) -> ByteOffset {
        ByteOffset(self.start.saturating_add(self.length))
    }

    #[must_use]
    pub fn to_line_col(&self, line_index: &LineIndex) -> (LineCol, LineCol) {
        (
            line_index.to_line_col(self.start_offset()),
            line_index.to_line_col(self.end_offset()),
        )
    }
}
