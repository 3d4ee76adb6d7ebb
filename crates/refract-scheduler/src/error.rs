use refract_frontend::FrontendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    #[error("analysis worker is not running")]
    WorkerUnavailable,
}
