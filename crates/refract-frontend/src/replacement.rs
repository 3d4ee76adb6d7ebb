use std::path::PathBuf;

use refract_core::{TextRange, TextSize};

use crate::decl::{SourceLocation, SourceRange};

/// A textual substitution produced by the front-end.
///
/// `file` is whatever path the front-end used; it is not necessarily canonical, and two
/// replacements may spell the same file differently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawReplacement {
    pub file: PathBuf,
    pub offset: TextSize,
    pub length: TextSize,
    pub replacement_text: String,
}

impl RawReplacement {
    pub fn new(
        file: impl Into<PathBuf>,
        offset: impl Into<TextSize>,
        length: impl Into<TextSize>,
        replacement_text: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            offset: offset.into(),
            length: length.into(),
            replacement_text: replacement_text.into(),
        }
    }

    pub fn replace(range: &SourceRange, replacement_text: impl Into<String>) -> Self {
        Self::new(
            range.file.as_path(),
            range.range.start(),
            range.range.len(),
            replacement_text,
        )
    }

    pub fn insert_at(location: &SourceLocation, text: impl Into<String>) -> Self {
        Self::new(location.file.as_path(), location.offset, TextSize::from(0), text)
    }

    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, self.length)
    }
}
