//! Byte offset <-> line/column translation.
//!
//! Columns are byte columns. Line breaks follow the snapshot's end-of-line convention:
//! `\n` always breaks, a `\r\n` pair is a single break, and a lone `\r` breaks only when the
//! snapshot uses the classic-Mac `\r` convention.
//!
//! Translation always runs against the exact bytes that were handed to the front-end, never
//! against a line table the front-end computed for its own (possibly stale) view of the file.

use serde::{Deserialize, Serialize};
use text_size::{TextRange, TextSize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum EndOfLine {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl EndOfLine {
    pub fn as_str(self) -> &'static str {
        match self {
            EndOfLine::Lf => "\n",
            EndOfLine::CrLf => "\r\n",
            EndOfLine::Cr => "\r",
        }
    }
}

/// Zero-based line and byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct LineColRange {
    pub start: LineCol,
    pub end: LineCol,
}

/// The first terminator in `text` decides the convention.
///
/// Text without any terminator is treated as LF.
pub fn detect_end_of_line(text: &[u8]) -> EndOfLine {
    for (idx, byte) in text.iter().enumerate() {
        match byte {
            b'\n' => return EndOfLine::Lf,
            b'\r' => {
                return match text.get(idx + 1) {
                    Some(b'\n') => EndOfLine::CrLf,
                    _ => EndOfLine::Cr,
                }
            }
            _ => {}
        }
    }
    EndOfLine::Lf
}

/// Length of the line break starting at `idx`, if any.
#[inline]
fn break_len(text: &[u8], idx: usize, eol: EndOfLine) -> Option<usize> {
    match text[idx] {
        b'\n' => Some(1),
        b'\r' if text.get(idx + 1) == Some(&b'\n') => Some(2),
        b'\r' if eol == EndOfLine::Cr => Some(1),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: usize,
    line: u32,
    line_start: usize,
}

impl Cursor {
    const START: Cursor = Cursor {
        offset: 0,
        line: 0,
        line_start: 0,
    };

    /// Walks forward to `target`, counting line breaks on the way.
    ///
    /// A `\r\n` pair straddling `target` is not counted; the position between the two bytes
    /// belongs to the line the pair terminates.
    fn advance_to(&mut self, text: &[u8], eol: EndOfLine, target: usize) {
        let mut idx = self.offset;
        while idx < target {
            match break_len(text, idx, eol) {
                Some(len) if idx + len <= target => {
                    idx += len;
                    self.line += 1;
                    self.line_start = idx;
                }
                _ => idx += 1,
            }
        }
        self.offset = target;
    }

    fn line_col(&self) -> LineCol {
        LineCol {
            line: self.line,
            column: (self.offset - self.line_start) as u32,
        }
    }
}

/// Translates `(offset, len)` into a start/end line/column pair with a single forward scan.
///
/// # Panics
///
/// Panics if `offset + len` lies past the end of `text`. Callers are expected to validate
/// front-end supplied ranges before translating them.
pub fn to_editor_range(
    text: &[u8],
    eol: EndOfLine,
    offset: TextSize,
    len: TextSize,
) -> LineColRange {
    let start = u32::from(offset) as usize;
    let end = start + u32::from(len) as usize;
    assert!(
        end <= text.len(),
        "range {start}..{end} is out of bounds for text of length {}",
        text.len()
    );

    let mut cursor = Cursor::START;
    cursor.advance_to(text, eol, start);
    let start_pos = cursor.line_col();
    cursor.advance_to(text, eol, end);
    LineColRange {
        start: start_pos,
        end: cursor.line_col(),
    }
}

/// Inverse of [`to_editor_range`] for a single position.
///
/// Returns `None` when `line` does not exist or `column` lies past the end of that line.
pub fn to_byte_offset(text: &[u8], eol: EndOfLine, line: u32, column: u32) -> Option<TextSize> {
    let mut current_line = 0u32;
    let mut line_start = 0usize;
    let mut idx = 0usize;

    while current_line < line {
        if idx >= text.len() {
            return None;
        }
        match break_len(text, idx, eol) {
            Some(len) => {
                idx += len;
                current_line += 1;
                line_start = idx;
            }
            None => idx += 1,
        }
    }

    // The line extends up to (but excluding) the start of the next line.
    let mut line_limit = text.len();
    while idx < text.len() {
        if let Some(len) = break_len(text, idx, eol) {
            line_limit = idx + len - 1;
            break;
        }
        idx += 1;
    }

    let offset = line_start.checked_add(column as usize)?;
    if offset > line_limit {
        return None;
    }
    Some(TextSize::from(offset as u32))
}

/// Pre-computed line starts for a snapshot.
///
/// Produces exactly the same answers as [`to_editor_range`] / [`to_byte_offset`], but in
/// `O(log n)` per query. Used when many ranges are translated against the same snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &[u8], eol: EndOfLine) -> Self {
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);

        let mut idx = 0;
        while idx < text.len() {
            match break_len(text, idx, eol) {
                Some(len) => {
                    idx += len;
                    line_starts.push(idx);
                }
                None => idx += 1,
            }
        }

        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        TextSize::from(self.text_len as u32)
    }

    fn line_limit(&self, line: usize) -> usize {
        match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.text_len,
        }
    }

    /// # Panics
    ///
    /// Panics if `offset` is past the end of the indexed text.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = u32::from(offset) as usize;
        assert!(
            offset <= self.text_len,
            "offset {offset} is out of bounds for text of length {}",
            self.text_len
        );
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert - 1,
        };
        LineCol {
            line: line as u32,
            column: (offset - self.line_starts[line]) as u32,
        }
    }

    pub fn range(&self, range: TextRange) -> LineColRange {
        LineColRange {
            start: self.line_col(range.start()),
            end: self.line_col(range.end()),
        }
    }

    pub fn offset(&self, pos: LineCol) -> Option<TextSize> {
        let line = pos.line as usize;
        let start = *self.line_starts.get(line)?;
        let offset = start.checked_add(pos.column as usize)?;
        if offset > self.line_limit(line) {
            return None;
        }
        Some(TextSize::from(offset as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(text: &str, offset: u32, len: u32) -> LineColRange {
        let eol = detect_end_of_line(text.as_bytes());
        to_editor_range(
            text.as_bytes(),
            eol,
            TextSize::from(offset),
            TextSize::from(len),
        )
    }

    #[test]
    fn detects_end_of_line_from_first_terminator() {
        assert_eq!(detect_end_of_line(b"a\r\nb"), EndOfLine::CrLf);
        assert_eq!(detect_end_of_line(b"a\nb"), EndOfLine::Lf);
        assert_eq!(detect_end_of_line(b"a\rb"), EndOfLine::Cr);
        assert_eq!(detect_end_of_line(b""), EndOfLine::Lf);
        assert_eq!(detect_end_of_line(b"abc"), EndOfLine::Lf);
        assert_eq!(detect_end_of_line(b"abc\r"), EndOfLine::Cr);
        assert_eq!(detect_end_of_line(b"a\nb\r\nc"), EndOfLine::Lf);
    }

    #[test]
    fn crlf_counts_as_one_break() {
        let text = "ab\r\ncd\r\nef";
        let r = range(text, 4, 2);
        assert_eq!(r.start, LineCol::new(1, 0));
        assert_eq!(r.end, LineCol::new(1, 2));

        let r = range(text, 8, 2);
        assert_eq!(r.start, LineCol::new(2, 0));
        assert_eq!(r.end, LineCol::new(2, 2));
    }

    #[test]
    fn lone_cr_breaks_only_under_cr_convention() {
        let cr = b"ab\rcd";
        let r = to_editor_range(cr, EndOfLine::Cr, TextSize::from(3), TextSize::from(0));
        assert_eq!(r.start, LineCol::new(1, 0));

        let r = to_editor_range(cr, EndOfLine::Lf, TextSize::from(3), TextSize::from(0));
        assert_eq!(r.start, LineCol::new(0, 3));
    }

    #[test]
    fn offset_between_cr_and_lf_stays_on_terminated_line() {
        let text = b"ab\r\ncd";
        let r = to_editor_range(text, EndOfLine::CrLf, TextSize::from(3), TextSize::from(2));
        assert_eq!(r.start, LineCol::new(0, 3));
        assert_eq!(r.end, LineCol::new(1, 1));
        assert_eq!(
            to_byte_offset(text, EndOfLine::CrLf, 0, 3),
            Some(TextSize::from(3))
        );
    }

    #[test]
    fn byte_offset_rejects_positions_past_line_end() {
        let text = b"ab\ncd";
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 0, 2), Some(TextSize::from(2)));
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 0, 3), None);
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 1, 2), Some(TextSize::from(5)));
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 1, 3), None);
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 2, 0), None);
    }

    #[test]
    fn trailing_newline_opens_an_empty_last_line() {
        let text = b"ab\n";
        assert_eq!(to_byte_offset(text, EndOfLine::Lf, 1, 0), Some(TextSize::from(3)));
        let r = to_editor_range(text, EndOfLine::Lf, TextSize::from(3), TextSize::from(0));
        assert_eq!(r.start, LineCol::new(1, 0));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_range_is_a_contract_violation() {
        to_editor_range(b"abc", EndOfLine::Lf, TextSize::from(2), TextSize::from(2));
    }

    #[test]
    fn line_index_matches_scan() {
        let text = b"int a;\r\nint b;\r\n\r\nint c;";
        let index = LineIndex::new(text, EndOfLine::CrLf);
        assert_eq!(index.line_count(), 4);
        for offset in 0..=text.len() as u32 {
            let scanned = to_editor_range(text, EndOfLine::CrLf, offset.into(), 0.into());
            assert_eq!(index.line_col(offset.into()), scanned.start);
            assert_eq!(
                index.offset(scanned.start),
                to_byte_offset(text, EndOfLine::CrLf, scanned.start.line, scanned.start.column)
            );
        }
    }
}
