//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::model::{ModuleIdError, QuizError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
///
/// Every variant is recoverable at the call site; the stored record is left as it was.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no learner id supplied")]
    NotAuthenticated,
    #[error(transparent)]
    InvalidScore(#[from] QuizError),
    #[error(transparent)]
    InvalidModule(#[from] ModuleIdError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LearnerSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("no learner is signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
