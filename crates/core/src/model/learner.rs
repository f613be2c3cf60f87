use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{LearnerId, ModuleId, QuizResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerRecordError {
    #[error("quiz for module {module} is passed but the module is not completed")]
    PassedNotCompleted { module: ModuleId },
}

/// Durable progress state for one learner.
///
/// Every module with a passed quiz is also in `completed_modules`; the mutators below
/// are the only way to change a record, and each of them keeps that rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PersistedLearnerRecord")]
pub struct LearnerRecord {
    id: LearnerId,
    completed_modules: BTreeSet<ModuleId>,
    quiz_scores: BTreeMap<ModuleId, QuizResult>,
    last_accessed: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedLearnerRecord {
    id: LearnerId,
    #[serde(default)]
    completed_modules: BTreeSet<ModuleId>,
    #[serde(default)]
    quiz_scores: BTreeMap<ModuleId, QuizResult>,
    last_accessed: DateTime<Utc>,
}

impl TryFrom<PersistedLearnerRecord> for LearnerRecord {
    type Error = LearnerRecordError;

    fn try_from(raw: PersistedLearnerRecord) -> Result<Self, Self::Error> {
        Self::from_persisted(
            raw.id,
            raw.completed_modules,
            raw.quiz_scores,
            raw.last_accessed,
        )
    }
}

impl LearnerRecord {
    /// Empty record for a learner that has no stored progress yet.
    #[must_use]
    pub fn new(id: LearnerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            completed_modules: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            last_accessed: now,
        }
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `LearnerRecordError::PassedNotCompleted` if a passed quiz has no matching
    /// completed module.
    pub fn from_persisted(
        id: LearnerId,
        completed_modules: BTreeSet<ModuleId>,
        quiz_scores: BTreeMap<ModuleId, QuizResult>,
        last_accessed: DateTime<Utc>,
    ) -> Result<Self, LearnerRecordError> {
        if let Some((module, _)) = quiz_scores
            .iter()
            .find(|(module, result)| result.passed() && !completed_modules.contains(*module))
        {
            return Err(LearnerRecordError::PassedNotCompleted {
                module: module.clone(),
            });
        }

        Ok(Self {
            id,
            completed_modules,
            quiz_scores,
            last_accessed,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LearnerId {
        &self.id
    }

    #[must_use]
    pub fn completed_modules(&self) -> &BTreeSet<ModuleId> {
        &self.completed_modules
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<ModuleId, QuizResult> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn quiz_result(&self, module: &ModuleId) -> Option<&QuizResult> {
        self.quiz_scores.get(module)
    }

    #[must_use]
    pub fn is_completed(&self, module: &ModuleId) -> bool {
        self.completed_modules.contains(module)
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed_modules.is_empty() && self.quiz_scores.is_empty()
    }

    /// Mark a module as completed.
    ///
    /// Returns `false` and leaves the record (including `last_accessed`) untouched when
    /// the module was already completed.
    pub fn mark_completed(&mut self, module: ModuleId, now: DateTime<Utc>) -> bool {
        if self.completed_modules.contains(&module) {
            return false;
        }
        self.completed_modules.insert(module);
        self.touch(now);
        true
    }

    /// Store `result` as the latest attempt for `module`, replacing any earlier one.
    ///
    /// A passed attempt also completes the module. A failed attempt never removes an
    /// existing completion.
    pub fn record_quiz(&mut self, module: ModuleId, result: QuizResult, now: DateTime<Utc>) {
        if result.passed() {
            self.completed_modules.insert(module.clone());
        }
        self.quiz_scores.insert(module, result);
        self.touch(now);
    }

    /// Drop all completions and quiz results.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.completed_modules.clear();
        self.quiz_scores.clear();
        self.touch(now);
    }

    // last_accessed never moves backwards, even if the clock does.
    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn learner() -> LearnerId {
        LearnerId::new("abc123").unwrap()
    }

    fn module(id: &str) -> ModuleId {
        ModuleId::new(id).unwrap()
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let start = fixed_now();
        let mut record = LearnerRecord::new(learner(), start);

        let later = start + Duration::minutes(5);
        assert!(record.mark_completed(module("encryption"), later));
        assert_eq!(record.last_accessed(), later);

        let much_later = later + Duration::minutes(5);
        assert!(!record.mark_completed(module("encryption"), much_later));
        assert_eq!(record.last_accessed(), later);
        assert_eq!(record.completed_modules().len(), 1);
    }

    #[test]
    fn passed_quiz_completes_module() {
        let now = fixed_now();
        let mut record = LearnerRecord::new(learner(), now);
        let result = QuizResult::new(4, 5, now).unwrap();

        record.record_quiz(module("hashing"), result.clone(), now);

        assert!(record.is_completed(&module("hashing")));
        assert_eq!(record.quiz_result(&module("hashing")), Some(&result));
    }

    #[test]
    fn failed_retake_keeps_completion() {
        let now = fixed_now();
        let mut record = LearnerRecord::new(learner(), now);
        record.record_quiz(module("hashing"), QuizResult::new(5, 5, now).unwrap(), now);
        record.record_quiz(module("hashing"), QuizResult::new(1, 5, now).unwrap(), now);

        assert!(record.is_completed(&module("hashing")));
        assert!(!record.quiz_result(&module("hashing")).unwrap().passed());
        assert_eq!(record.quiz_scores().len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let now = fixed_now();
        let mut record = LearnerRecord::new(learner(), now);
        record.mark_completed(module("encryption"), now);
        record.record_quiz(module("hashing"), QuizResult::new(2, 5, now).unwrap(), now);

        let later = now + Duration::hours(1);
        record.reset(later);

        assert!(record.is_empty());
        assert_eq!(record.last_accessed(), later);
    }

    #[test]
    fn last_accessed_does_not_move_backwards() {
        let now = fixed_now();
        let mut record = LearnerRecord::new(learner(), now);
        record.mark_completed(module("encryption"), now - Duration::days(1));
        assert_eq!(record.last_accessed(), now);
    }

    #[test]
    fn from_persisted_rejects_passed_but_incomplete() {
        let now = fixed_now();
        let mut scores = BTreeMap::new();
        scores.insert(module("hashing"), QuizResult::new(5, 5, now).unwrap());

        let err = LearnerRecord::from_persisted(learner(), BTreeSet::new(), scores, now)
            .unwrap_err();
        assert_eq!(
            err,
            LearnerRecordError::PassedNotCompleted {
                module: module("hashing")
            }
        );
    }

    #[test]
    fn serializes_to_logical_layout() {
        let now = fixed_now();
        let mut record = LearnerRecord::new(learner(), now);
        record.record_quiz(module("hashing"), QuizResult::new(4, 5, now).unwrap(), now);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "abc123");
        assert_eq!(value["completedModules"][0], "hashing");
        assert_eq!(value["quizScores"]["hashing"]["percentage"], 80.0);
        assert_eq!(value["quizScores"]["hashing"]["passed"], true);
        assert_eq!(value["lastAccessed"], "2023-11-14T22:13:20Z");

        let back: LearnerRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
