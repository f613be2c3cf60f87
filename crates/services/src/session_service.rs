use std::sync::Arc;
use std::time::Duration;

use progress_core::model::LearnerId;
use storage::repository::CurrentLearnerRepository;

use crate::error::SessionServiceError;
use crate::timeout::{DEFAULT_STORAGE_TIMEOUT, bounded};

/// Tracks which learner is signed in on this device.
///
/// Signing in only remembers the id; the learner's progress record is still created
/// lazily by the first progress write.
#[derive(Clone)]
pub struct LearnerSessionService {
    current: Arc<dyn CurrentLearnerRepository>,
    storage_timeout: Duration,
}

impl LearnerSessionService {
    #[must_use]
    pub fn new(current: Arc<dyn CurrentLearnerRepository>) -> Self {
        Self {
            current,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_storage_timeout(mut self, limit: Duration) -> Self {
        self.storage_timeout = limit;
        self
    }

    /// Remember `learner` as the signed-in learner.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotAuthenticated` if `learner` is blank.
    /// Returns `SessionServiceError::Storage` if the choice cannot be stored.
    pub async fn sign_in(&self, learner: &str) -> Result<LearnerId, SessionServiceError> {
        let id = LearnerId::new(learner).map_err(|_| SessionServiceError::NotAuthenticated)?;
        bounded(
            self.storage_timeout,
            "set_current_learner",
            self.current.set_current_learner(Some(&id)),
        )
        .await?;
        tracing::info!(learner = %id, "learner signed in");
        Ok(id)
    }

    /// Forget the signed-in learner, returning who it was.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if storage access fails.
    pub async fn sign_out(&self) -> Result<Option<LearnerId>, SessionServiceError> {
        let previous = self.current().await?;
        bounded(
            self.storage_timeout,
            "set_current_learner",
            self.current.set_current_learner(None),
        )
        .await?;
        if let Some(id) = &previous {
            tracing::info!(learner = %id, "learner signed out");
        }
        Ok(previous)
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if storage access fails.
    pub async fn current(&self) -> Result<Option<LearnerId>, SessionServiceError> {
        let id = bounded(
            self.storage_timeout,
            "get_current_learner",
            self.current.get_current_learner(),
        )
        .await?;
        Ok(id)
    }

    /// The signed-in learner, required for progress operations.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotAuthenticated` if nobody is signed in.
    /// Returns `SessionServiceError::Storage` if storage access fails.
    pub async fn require_current(&self) -> Result<LearnerId, SessionServiceError> {
        self.current()
            .await?
            .ok_or(SessionServiceError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn sign_in_and_out() {
        let svc = LearnerSessionService::new(Arc::new(InMemoryRepository::new()));

        assert!(matches!(
            svc.require_current().await,
            Err(SessionServiceError::NotAuthenticated)
        ));

        let id = svc.sign_in("abc123").await.unwrap();
        assert_eq!(svc.require_current().await.unwrap(), id);

        assert_eq!(svc.sign_out().await.unwrap(), Some(id));
        assert_eq!(svc.current().await.unwrap(), None);
        assert_eq!(svc.sign_out().await.unwrap(), None);
    }

    #[tokio::test]
    async fn blank_sign_in_is_rejected() {
        let svc = LearnerSessionService::new(Arc::new(InMemoryRepository::new()));
        assert!(matches!(
            svc.sign_in("").await,
            Err(SessionServiceError::NotAuthenticated)
        ));
        assert_eq!(svc.current().await.unwrap(), None);
    }
}
