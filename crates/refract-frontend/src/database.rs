use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use refract_core::FileIdentity;
use serde::Deserialize;

use crate::error::FrontendError;

pub const COMPILE_COMMANDS_FILE: &str = "compile_commands.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: FileIdentity,
    pub arguments: Vec<String>,
}

/// Per-file compiler invocations for the project.
///
/// Treated as a black box keyed by file identity.
pub trait CompilationDatabase: Send + Sync {
    /// Every main source file, in database order.
    fn all_files(&self) -> Vec<FileIdentity>;

    fn compile_command(&self, file: &FileIdentity) -> Option<CompileCommand>;

    fn contains(&self, file: &FileIdentity) -> bool {
        self.compile_command(file).is_some()
    }
}

/// The same flags for a fixed list of files.
#[derive(Debug, Clone, Default)]
pub struct FixedCompilationDatabase {
    directory: PathBuf,
    files: Vec<FileIdentity>,
    arguments: Vec<String>,
}

impl FixedCompilationDatabase {
    pub fn new(
        directory: impl Into<PathBuf>,
        files: impl IntoIterator<Item = FileIdentity>,
        arguments: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut unique: Vec<FileIdentity> = Vec::new();
        for file in files {
            if !unique.contains(&file) {
                unique.push(file);
            }
        }
        Self {
            directory: directory.into(),
            files: unique,
            arguments: arguments.into_iter().collect(),
        }
    }
}

impl CompilationDatabase for FixedCompilationDatabase {
    fn all_files(&self) -> Vec<FileIdentity> {
        self.files.clone()
    }

    fn compile_command(&self, file: &FileIdentity) -> Option<CompileCommand> {
        if !self.files.contains(file) {
            return None;
        }
        let mut arguments = self.arguments.clone();
        arguments.push(file.to_string());
        Some(CompileCommand {
            directory: self.directory.clone(),
            file: file.clone(),
            arguments,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

/// A `compile_commands.json` database.
#[derive(Debug, Clone, Default)]
pub struct JsonCompilationDatabase {
    order: Vec<FileIdentity>,
    commands: BTreeMap<FileIdentity, CompileCommand>,
}

impl JsonCompilationDatabase {
    /// Loads `compile_commands.json` from a build directory.
    pub fn load_from_directory(build_dir: &Path) -> Result<Self, FrontendError> {
        let path = build_dir.join(COMPILE_COMMANDS_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| FrontendError::DatabaseIo {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&path, &text)
    }

    /// Parses database JSON; `path` is only used for error messages.
    pub fn from_json(path: &Path, text: &str) -> Result<Self, FrontendError> {
        let entries: Vec<RawEntry> =
            serde_json::from_str(text).map_err(|err| FrontendError::DatabaseFormat {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let mut db = Self::default();
        for entry in entries {
            let arguments = match (entry.arguments, entry.command) {
                (Some(arguments), _) => arguments,
                (None, Some(command)) => split_command_line(&command),
                (None, None) => {
                    return Err(FrontendError::DatabaseFormat {
                        path: path.to_path_buf(),
                        message: format!(
                            "entry for {} has neither `arguments` nor `command`",
                            entry.file.display()
                        ),
                    })
                }
            };
            let file = FileIdentity::resolve(&entry.directory, &entry.file);
            // Later entries for the same file win, matching how build tools append.
            if !db.commands.contains_key(&file) {
                db.order.push(file.clone());
            }
            db.commands.insert(
                file.clone(),
                CompileCommand {
                    directory: entry.directory,
                    file,
                    arguments,
                },
            );
        }

        tracing::debug!(
            target: "refract.frontend",
            path = %path.display(),
            files = db.order.len(),
            "loaded compilation database"
        );
        Ok(db)
    }
}

impl CompilationDatabase for JsonCompilationDatabase {
    fn all_files(&self) -> Vec<FileIdentity> {
        self.order.clone()
    }

    fn compile_command(&self, file: &FileIdentity) -> Option<CompileCommand> {
        self.commands.get(file).cloned()
    }

    fn contains(&self, file: &FileIdentity) -> bool {
        self.commands.contains_key(file)
    }
}

/// Splits a shell command line the way a POSIX shell would for the subset compile databases
/// use: whitespace separation, single and double quotes, and backslash escapes.
fn split_command_line(command: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            '\'' => {
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                    current.push(next);
                }
                in_word = true;
            }
            '"' => {
                while let Some(next) = chars.next() {
                    match next {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(next),
                    }
                }
                in_word = true;
            }
            ch if ch.is_whitespace() => {
                if in_word {
                    out.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if in_word {
        out.push(current);
    }
    out
}
