use refract_core::{EditError, FileIdentity, TextSize};
use refract_frontend::{FrontendError, SourceLocation};
use refract_scheduler::TaskError;
use refract_vfs::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("no declaration found at {0}")]
    TargetNotFound(SourceLocation),
    #[error("no expression found at {0}")]
    ExpressionNotFound(SourceLocation),
    #[error("replacement at {offset:?}+{length:?} is outside {file} (len={len})")]
    InvalidRange {
        file: FileIdentity,
        offset: TextSize,
        length: TextSize,
        len: usize,
    },
    #[error("position {line}:{column} does not exist in {file}")]
    InvalidPosition {
        file: FileIdentity,
        line: u32,
        column: u32,
    },
    #[error("refactoring was cancelled")]
    Cancelled,
    #[error("{0}")]
    NothingToDo(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Edit(#[from] EditError),
}
