use async_trait::async_trait;
use progress_core::model::{LearnerId, LearnerRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backend could not be initialized; retried on the next call.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage operation timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of a `StorageError`, for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    Unavailable,
    Timeout,
    Connection,
    Serialization,
}

impl StorageError {
    #[must_use]
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::Unavailable(_) => StorageErrorKind::Unavailable,
            StorageError::Timeout => StorageErrorKind::Timeout,
            StorageError::Connection(_) => StorageErrorKind::Connection,
            StorageError::Serialization(_) => StorageErrorKind::Serialization,
        }
    }
}

/// Whole-record store for learner progress.
///
/// Implementations do not serialize writers: two `put_record` calls for the same learner
/// race with last-write-wins. Callers that read-modify-write must provide their own
/// per-learner ordering.
#[async_trait]
pub trait LearnerRecordRepository: Send + Sync {
    /// Fetch the record for a learner.
    ///
    /// Returns `Ok(None)` when the learner has never been written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be initialized, or other
    /// storage errors.
    async fn get_record(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, StorageError>;

    /// Replace the stored record for `record.id()` in full.
    ///
    /// Once this returns `Ok`, later reads observe the new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn put_record(&self, record: &LearnerRecord) -> Result<(), StorageError>;
}

/// Remembers which learner is signed in on this device.
#[async_trait]
pub trait CurrentLearnerRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be read.
    async fn get_current_learner(&self) -> Result<Option<LearnerId>, StorageError>;

    /// Set or clear (`None`) the signed-in learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_current_learner(&self, id: Option<&LearnerId>) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<LearnerId, LearnerRecord>>>,
    current: Arc<Mutex<Option<LearnerId>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearnerRecordRepository for InMemoryRepository {
    async fn get_record(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn put_record(&self, record: &LearnerRecord) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.id().clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl CurrentLearnerRepository for InMemoryRepository {
    async fn get_current_learner(&self) -> Result<Option<LearnerId>, StorageError> {
        let guard = self
            .current
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn set_current_learner(&self, id: Option<&LearnerId>) -> Result<(), StorageError> {
        let mut guard = self
            .current
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = id.cloned();
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub records: Arc<dyn LearnerRecordRepository>,
    pub current_learner: Arc<dyn CurrentLearnerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let records: Arc<dyn LearnerRecordRepository> = Arc::new(repo.clone());
        let current_learner: Arc<dyn CurrentLearnerRepository> = Arc::new(repo);
        Self {
            records,
            current_learner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{ModuleId, QuizResult};
    use progress_core::time::fixed_now;

    fn learner(id: &str) -> LearnerId {
        LearnerId::new(id).unwrap()
    }

    #[tokio::test]
    async fn absent_learner_reads_as_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_record(&learner("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_whole_record() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let mut first = LearnerRecord::new(learner("abc123"), now);
        first.mark_completed(ModuleId::new("encryption").unwrap(), now);
        first.record_quiz(
            ModuleId::new("hashing").unwrap(),
            QuizResult::new(1, 5, now).unwrap(),
            now,
        );
        repo.put_record(&first).await.unwrap();

        let second = LearnerRecord::new(learner("abc123"), now);
        repo.put_record(&second).await.unwrap();

        let fetched = repo.get_record(&learner("abc123")).await.unwrap().unwrap();
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn ids_are_case_sensitive() {
        let repo = InMemoryRepository::new();
        repo.put_record(&LearnerRecord::new(learner("abc"), fixed_now()))
            .await
            .unwrap();
        assert!(repo.get_record(&learner("ABC")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn current_learner_round_trips() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_current_learner().await.unwrap(), None);

        repo.set_current_learner(Some(&learner("abc123"))).await.unwrap();
        assert_eq!(
            repo.get_current_learner().await.unwrap(),
            Some(learner("abc123"))
        );

        repo.set_current_learner(None).await.unwrap();
        assert_eq!(repo.get_current_learner().await.unwrap(), None);
    }

    #[test]
    fn error_kind_matches_variant() {
        assert_eq!(StorageError::Timeout.kind(), StorageErrorKind::Timeout);
        assert_eq!(
            StorageError::Unavailable("quota".into()).kind(),
            StorageErrorKind::Unavailable
        );
    }
}
