//! Core primitives shared by the refract crates.
//!
//! - [`FileIdentity`]: canonical file keys used to join the editor, the content resolver and the
//!   front-end's file model.
//! - Position translation between byte offsets and editor line/column pairs, aware of the
//!   snapshot's end-of-line convention.
//! - Editor change sets and a deterministic way to apply them to a text snapshot.

mod edit;
mod path;
mod text;

pub use edit::{
    apply_editor_changes, group_by_file, normalize_editor_changes, EditError, EditorChange,
    EditorRange,
};
pub use path::{normalize_lexically, FileIdentity};
pub use text::{
    detect_end_of_line, to_byte_offset, to_editor_range, EndOfLine, LineCol, LineColRange,
    LineIndex,
};
pub use text_size::{TextRange, TextSize};
