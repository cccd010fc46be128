use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;

/// Errors surfaced through a writer's offset futures.
///
/// The error is `Clone` because a single fault propagates through the shared
/// tail future to every write queued after it: each of those futures resolves
/// to its own copy of the original fault.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum FileWriterError {
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("write task failed: {0}")]
    TaskFailure(#[source] Arc<JoinError>),

    #[error("writer already closed")]
    Closed,
}

// Define our own result type here (this seems to be the standard).
pub type Result<T> = std::result::Result<T, FileWriterError>;

impl From<std::io::Error> for FileWriterError {
    fn from(value: std::io::Error) -> Self {
        FileWriterError::Io(Arc::new(value))
    }
}

impl From<JoinError> for FileWriterError {
    fn from(value: JoinError) -> Self {
        FileWriterError::TaskFailure(Arc::new(value))
    }
}

impl PartialEq for FileWriterError {
    fn eq(&self, other: &FileWriterError) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
