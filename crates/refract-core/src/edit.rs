//! Editor-level change sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use text_size::{TextRange, TextSize};

use crate::path::FileIdentity;
use crate::text::{EndOfLine, LineCol, LineColRange, LineIndex};

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EditorRange {
    pub file: FileIdentity,
    pub start: LineCol,
    pub end: LineCol,
}

impl EditorRange {
    pub fn new(file: FileIdentity, range: LineColRange) -> Self {
        Self {
            file,
            start: range.start,
            end: range.end,
        }
    }

    pub fn line_cols(&self) -> LineColRange {
        LineColRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// A single change the editor applies atomically with the rest of its change set.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EditorChange {
    pub range: EditorRange,
    pub new_text: String,
    /// The editor must not compare the current buffer text against an expected old text.
    pub ignore_old_text: bool,
}

impl EditorChange {
    pub fn new(range: EditorRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
            ignore_old_text: true,
        }
    }

    #[inline]
    pub fn file(&self) -> &FileIdentity {
        &self.range.file
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EditError {
    PositionOutOfBounds { line: u32, column: u32 },
    InvertedRange { start: LineCol, end: LineCol },
    OverlappingEdits { first: TextRange, second: TextRange },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::PositionOutOfBounds { line, column } => {
                write!(f, "position {line}:{column} does not exist in the text")
            }
            EditError::InvertedRange { start, end } => write!(
                f,
                "range end {}:{} precedes its start {}:{}",
                end.line, end.column, start.line, start.column
            ),
            EditError::OverlappingEdits { first, second } => {
                write!(f, "overlapping edits: {first:?} overlaps {second:?}")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Groups changes by file, keeping each file's changes in their original order.
pub fn group_by_file<'a>(
    changes: impl IntoIterator<Item = &'a EditorChange>,
) -> BTreeMap<FileIdentity, Vec<EditorChange>> {
    let mut out: BTreeMap<FileIdentity, Vec<EditorChange>> = BTreeMap::new();
    for change in changes {
        out.entry(change.file().clone())
            .or_default()
            .push(change.clone());
    }
    out
}

/// Resolves changes to byte ranges, sorts them and checks for overlaps.
///
/// The file component of each change is ignored; callers group changes per file first.
pub fn normalize_editor_changes<'a>(
    text: &[u8],
    eol: EndOfLine,
    changes: impl IntoIterator<Item = &'a EditorChange>,
) -> Result<Vec<(TextRange, &'a str)>, EditError> {
    let index = LineIndex::new(text, eol);
    let mut edits = Vec::new();

    for change in changes {
        let start = resolve(&index, change.range.start)?;
        let end = resolve(&index, change.range.end)?;
        if end < start {
            return Err(EditError::InvertedRange {
                start: change.range.start,
                end: change.range.end,
            });
        }
        edits.push((TextRange::new(start, end), change.new_text.as_str()));
    }

    edits.sort_by_key(|(range, _)| (range.start(), range.end()));
    for pair in edits.windows(2) {
        let (first, _) = pair[0];
        let (second, _) = pair[1];
        if first.end() > second.start() || (first.is_empty() && first == second) {
            return Err(EditError::OverlappingEdits { first, second });
        }
    }
    Ok(edits)
}

fn resolve(index: &LineIndex, pos: LineCol) -> Result<TextSize, EditError> {
    index.offset(pos).ok_or(EditError::PositionOutOfBounds {
        line: pos.line,
        column: pos.column,
    })
}

/// Applies a change set to a text snapshot.
///
/// Changes are applied from the end of the text backwards so earlier ranges stay valid, which
/// makes the result independent of the order the changes were supplied in.
pub fn apply_editor_changes<'a>(
    text: &[u8],
    eol: EndOfLine,
    changes: impl IntoIterator<Item = &'a EditorChange>,
) -> Result<Vec<u8>, EditError> {
    let edits = normalize_editor_changes(text, eol, changes)?;
    let mut out = text.to_vec();
    for (range, replacement) in edits.into_iter().rev() {
        let start = u32::from(range.start()) as usize;
        let end = u32::from(range.end()) as usize;
        out.splice(start..end, replacement.bytes());
    }
    Ok(out)
}
