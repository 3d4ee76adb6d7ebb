use std::collections::{BTreeSet, HashMap};

use refract_core::{EditorChange, EditorRange, FileIdentity, LineIndex, TextRange};
use refract_frontend::RawReplacement;
use refract_vfs::{ContentSnapshot, ContentView};

use crate::RefactorError;

/// Editor changes for one refactoring, plus the replacements that had to be skipped.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Sorted and free of duplicates.
    pub changes: Vec<EditorChange>,
    pub errors: Vec<RefactorError>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Converts front-end replacements into editor changes.
///
/// Each replacement is mapped against `content`, which must serve the same view the analysis
/// tool was seeded with (see [`refract_vfs::ContentResolver::seeded_view`]).
/// Replacements for unreadable files are skipped and reported in [`ChangeSet::errors`]; if
/// nothing survives, the first such error is returned instead. A replacement that does not fit
/// its file aborts the whole batch.
pub fn to_editor_changes<V>(
    replacements: impl IntoIterator<Item = RawReplacement>,
    content: &mut V,
) -> Result<ChangeSet, RefactorError>
where
    V: ContentView + ?Sized,
{
    let mut changes = BTreeSet::new();
    let mut errors = Vec::new();
    // One snapshot per file for the whole batch.
    let mut files: HashMap<FileIdentity, (ContentSnapshot, LineIndex)> = HashMap::new();

    for replacement in replacements {
        let file = FileIdentity::new(&replacement.file);
        if !files.contains_key(&file) {
            match content.snapshot(&file) {
                Ok(snapshot) => {
                    let index = snapshot.line_index();
                    files.insert(file.clone(), (snapshot, index));
                }
                Err(err) => {
                    tracing::warn!(
                        target: "refract.refactor",
                        file = %file,
                        error = %err,
                        "skipping replacement for unreadable file"
                    );
                    errors.push(RefactorError::Resolve(err));
                    continue;
                }
            }
        }
        let Some((snapshot, index)) = files.get(&file) else {
            continue;
        };

        let offset = u32::from(replacement.offset) as usize;
        let length = u32::from(replacement.length) as usize;
        if !snapshot.contains_range(offset, length) {
            tracing::error!(
                target: "refract.refactor",
                file = %file,
                offset,
                length,
                len = snapshot.len(),
                "replacement outside of file bounds"
            );
            return Err(RefactorError::InvalidRange {
                file,
                offset: replacement.offset,
                length: replacement.length,
                len: snapshot.len(),
            });
        }

        let range = index.range(TextRange::at(replacement.offset, replacement.length));
        changes.insert(EditorChange::new(
            EditorRange::new(file, range),
            replacement.replacement_text,
        ));
    }

    if changes.is_empty() && !errors.is_empty() {
        return Err(errors.swap_remove(0));
    }

    Ok(ChangeSet {
        changes: changes.into_iter().collect(),
        errors,
    })
}
