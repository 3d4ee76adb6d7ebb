use std::io;
use std::path::PathBuf;

use refract_core::FileIdentity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to parse {file}: {message}")]
    Parse { file: FileIdentity, message: String },
    #[error("no compile command for {0}")]
    MissingCompileCommand(FileIdentity),
    #[error("failed to read compilation database {path}: {source}")]
    DatabaseIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed compilation database {path}: {message}")]
    DatabaseFormat { path: PathBuf, message: String },
    #[error("failed to create analysis tool: {0}")]
    Tool(String),
}
