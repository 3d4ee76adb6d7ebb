use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use refract_core::{
    detect_end_of_line, to_byte_offset, to_editor_range, EndOfLine, FileIdentity, LineCol,
    LineColRange, LineIndex, TextSize,
};

/// An immutable view of a file's bytes together with its end-of-line convention.
///
/// Cloning is cheap; clones share the same bytes. A snapshot is never mutated: edits produce a
/// new snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentSnapshot {
    bytes: Arc<[u8]>,
    eol: EndOfLine,
}

impl ContentSnapshot {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let eol = detect_end_of_line(&bytes);
        Self { bytes, eol }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(text.as_bytes())
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn end_of_line(&self) -> EndOfLine {
        self.eol
    }

    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// See [`refract_core::to_editor_range`]; panics if the range is out of bounds.
    pub fn to_editor_range(&self, offset: TextSize, len: TextSize) -> LineColRange {
        to_editor_range(&self.bytes, self.eol, offset, len)
    }

    pub fn to_byte_offset(&self, pos: LineCol) -> Option<TextSize> {
        to_byte_offset(&self.bytes, self.eol, pos.line, pos.column)
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(&self.bytes, self.eol)
    }

    /// Returns `true` when `offset..offset + len` lies within the snapshot.
    pub fn contains_range(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.bytes.len())
    }
}

impl fmt::Debug for ContentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSnapshot")
            .field("len", &self.bytes.len())
            .field("eol", &self.eol)
            .finish()
    }
}

/// Anything that can serve in-memory content for a path instead of reading it from disk.
///
/// Front-end analysis tools implement this so edited buffers are visible to analysis without
/// being written out.
pub trait VirtualFileSink {
    fn map_virtual_file(&mut self, file: &FileIdentity, content: &ContentSnapshot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_convention_on_construction() {
        assert_eq!(
            ContentSnapshot::from_text("a\r\nb").end_of_line(),
            EndOfLine::CrLf
        );
        assert_eq!(ContentSnapshot::from_text("").end_of_line(), EndOfLine::Lf);
    }

    #[test]
    fn range_checks_do_not_overflow() {
        let snapshot = ContentSnapshot::from_text("abc");
        assert!(snapshot.contains_range(1, 2));
        assert!(!snapshot.contains_range(2, 2));
        assert!(!snapshot.contains_range(usize::MAX, 2));
    }
}
