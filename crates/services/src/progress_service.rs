use std::sync::Arc;
use std::time::Duration;

use progress_core::Catalog;
use progress_core::model::{LearnerId, LearnerRecord, ModuleId, QuizResult};
use storage::repository::LearnerRecordRepository;

use crate::Clock;
use crate::error::ProgressError;
use crate::locks::LearnerLocks;
use crate::summary::ProgressSummary;
use crate::timeout::{DEFAULT_STORAGE_TIMEOUT, bounded};

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records module completions and quiz scores for learners.
///
/// Each mutating call reads the learner's record, applies one pure transformation from
/// `LearnerRecord`, and writes the whole record back while holding that learner's lock,
/// so back-to-back calls for the same learner cannot lose each other's updates.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    records: Arc<dyn LearnerRecordRepository>,
    catalog: Arc<Catalog>,
    locks: Arc<LearnerLocks>,
    storage_timeout: Duration,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        records: Arc<dyn LearnerRecordRepository>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            clock,
            records,
            catalog,
            locks: Arc::new(LearnerLocks::default()),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    /// Override how long a single storage call may take.
    #[must_use]
    pub fn with_storage_timeout(mut self, limit: Duration) -> Self {
        self.storage_timeout = limit;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Mark `module` as completed for `learner`.
    ///
    /// Completing an already completed module is a no-op: nothing is written and
    /// `last_accessed` keeps its previous value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::InvalidModule` if `module` is blank.
    /// Returns `ProgressError::Storage` if the record cannot be read or written.
    pub async fn mark_module_completed(
        &self,
        learner: &str,
        module: &str,
    ) -> Result<LearnerRecord, ProgressError> {
        let id = learner_id(learner)?;
        let module = ModuleId::new(module)?;

        let _guard = self.locks.lock(&id).await;
        let now = self.clock.now();
        let mut record = self.load_or_default(&id, now).await?;

        if !record.mark_completed(module.clone(), now) {
            tracing::debug!(learner = %id, module = %module, "module already completed");
            return Ok(record);
        }

        self.store(&record).await?;
        tracing::info!(learner = %id, module = %module, "module marked completed");
        Ok(record)
    }

    /// Grade a quiz attempt and store it as the latest result for `module`.
    ///
    /// A passing attempt (`score >= ceil(total * 0.7)`) also completes the module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::InvalidModule` if `module` is blank.
    /// Returns `ProgressError::InvalidScore` if `total <= 0`, `score < 0` or `score > total`.
    /// Returns `ProgressError::Storage` if the record cannot be read or written.
    pub async fn record_quiz_score(
        &self,
        learner: &str,
        module: &str,
        score: i64,
        total: i64,
    ) -> Result<LearnerRecord, ProgressError> {
        let id = learner_id(learner)?;
        let module = ModuleId::new(module)?;
        let result = QuizResult::new(score, total, self.clock.now())?;

        let _guard = self.locks.lock(&id).await;
        let now = self.clock.now();
        let mut record = self.load_or_default(&id, now).await?;

        let passed = result.passed();
        let percentage = result.percentage();
        record.record_quiz(module.clone(), result, now);

        self.store(&record).await?;
        tracing::info!(
            learner = %id,
            module = %module,
            score,
            total,
            percentage,
            passed,
            "quiz score recorded"
        );
        Ok(record)
    }

    /// Clear all completions and quiz results for `learner`.
    ///
    /// Irreversible; callers confirm with the user first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::Storage` if the record cannot be read or written.
    pub async fn reset_progress(&self, learner: &str) -> Result<LearnerRecord, ProgressError> {
        let id = learner_id(learner)?;

        let _guard = self.locks.lock(&id).await;
        let now = self.clock.now();
        let mut record = self.load_or_default(&id, now).await?;
        record.reset(now);

        self.store(&record).await?;
        tracing::info!(learner = %id, "progress reset");
        Ok(record)
    }

    /// Read-only projection of `learner`'s progress over the catalog.
    ///
    /// A learner with no stored record gets an all-empty summary; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::Storage` if the record cannot be read.
    pub async fn get_summary(&self, learner: &str) -> Result<ProgressSummary, ProgressError> {
        let id = learner_id(learner)?;
        let record = self.fetch(&id).await?;
        let summary = ProgressSummary::build(&self.catalog, &id, record.as_ref());
        tracing::debug!(
            learner = %id,
            completed = summary.completed_count,
            all_complete = summary.is_complete(),
            "summary built"
        );
        Ok(summary)
    }

    /// Current record for `learner`, or an unsaved empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::Storage` if the record cannot be read.
    pub async fn get_record(&self, learner: &str) -> Result<LearnerRecord, ProgressError> {
        let id = learner_id(learner)?;
        let now = self.clock.now();
        self.load_or_default(&id, now).await
    }

    /// Whether `learner` has completed `module`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAuthenticated` if `learner` is blank.
    /// Returns `ProgressError::InvalidModule` if `module` is blank.
    /// Returns `ProgressError::Storage` if the record cannot be read.
    pub async fn is_module_completed(
        &self,
        learner: &str,
        module: &str,
    ) -> Result<bool, ProgressError> {
        let id = learner_id(learner)?;
        let module = ModuleId::new(module)?;
        let record = self.fetch(&id).await?;
        Ok(record.is_some_and(|r| r.is_completed(&module)))
    }

    async fn fetch(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, ProgressError> {
        let record = bounded(self.storage_timeout, "get", self.records.get_record(id)).await?;
        Ok(record)
    }

    async fn load_or_default(
        &self,
        id: &LearnerId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<LearnerRecord, ProgressError> {
        Ok(self
            .fetch(id)
            .await?
            .unwrap_or_else(|| LearnerRecord::new(id.clone(), now)))
    }

    async fn store(&self, record: &LearnerRecord) -> Result<(), ProgressError> {
        bounded(self.storage_timeout, "put", self.records.put_record(record)).await?;
        Ok(())
    }
}

/// The learner id is the only identity the hub has; a blank one means nobody signed in.
fn learner_id(raw: &str) -> Result<LearnerId, ProgressError> {
    LearnerId::new(raw).map_err(|_| ProgressError::NotAuthenticated)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use progress_core::model::QuizError;
    use progress_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository, clock: Clock) -> ProgressService {
        ProgressService::new(clock, Arc::new(repo.clone()), Arc::new(Catalog::builtin()))
    }

    #[tokio::test]
    async fn blank_learner_is_not_authenticated() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Clock::fixed(fixed_now()));

        assert!(matches!(
            svc.mark_module_completed("", "hashing").await,
            Err(ProgressError::NotAuthenticated)
        ));
        assert!(matches!(
            svc.record_quiz_score("  ", "hashing", 1, 2).await,
            Err(ProgressError::NotAuthenticated)
        ));
        assert!(matches!(
            svc.reset_progress("").await,
            Err(ProgressError::NotAuthenticated)
        ));
        assert!(matches!(
            svc.get_summary("").await,
            Err(ProgressError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn invalid_scores_write_nothing() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Clock::fixed(fixed_now()));

        let err = svc.record_quiz_score("abc123", "hashing", 6, 5).await;
        assert!(matches!(
            err,
            Err(ProgressError::InvalidScore(QuizError::ScoreExceedsTotal { .. }))
        ));
        let err = svc.record_quiz_score("abc123", "hashing", -1, 5).await;
        assert!(matches!(
            err,
            Err(ProgressError::InvalidScore(QuizError::NegativeScore { .. }))
        ));
        let err = svc.record_quiz_score("abc123", "hashing", 0, 0).await;
        assert!(matches!(
            err,
            Err(ProgressError::InvalidScore(QuizError::NonPositiveTotal { .. }))
        ));

        let stored = repo
            .get_record(&LearnerId::new("abc123").unwrap())
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn completion_no_op_keeps_timestamp() {
        let repo = InMemoryRepository::new();
        let start = Clock::fixed(fixed_now());

        let first = service(&repo, start)
            .mark_module_completed("abc123", "encryption")
            .await
            .unwrap();

        let later = start.advanced(ChronoDuration::minutes(10));
        let second = service(&repo, later)
            .mark_module_completed("abc123", "encryption")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.last_accessed(), fixed_now());
    }

    #[tokio::test]
    async fn blank_module_is_rejected() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Clock::fixed(fixed_now()));
        assert!(matches!(
            svc.mark_module_completed("abc123", "").await,
            Err(ProgressError::InvalidModule(_))
        ));
    }
}
