use chrono::{DateTime, Utc};
use serde::Serialize;

use progress_core::Catalog;
use progress_core::model::{LearnerId, LearnerRecord, ModuleId, QuizResult, percentage};

/// Per-module row of a learner's progress, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub module_id: ModuleId,
    pub title: String,
    pub has_quiz: bool,
    pub completed: bool,
    pub quiz: Option<QuizResult>,
}

/// Aggregated view of a learner's progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub learner: LearnerId,
    pub completed_count: usize,
    pub total_learnable: usize,
    pub completion_percentage: f64,
    pub modules: Vec<ModuleProgress>,
    /// `None` when nothing has been stored for this learner yet.
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ProgressSummary {
    /// Project a stored record (or its absence) onto the catalog's learnable modules.
    ///
    /// Completed modules the catalog does not list as learnable are not counted.
    #[must_use]
    pub fn build(catalog: &Catalog, learner: &LearnerId, record: Option<&LearnerRecord>) -> Self {
        let modules: Vec<ModuleProgress> = catalog
            .learnable()
            .map(|entry| ModuleProgress {
                module_id: entry.id().clone(),
                title: entry.title().to_owned(),
                has_quiz: entry.has_quiz(),
                completed: record.is_some_and(|r| r.is_completed(entry.id())),
                quiz: record.and_then(|r| r.quiz_result(entry.id()).cloned()),
            })
            .collect();

        let completed_count = modules.iter().filter(|m| m.completed).count();
        let total_learnable = catalog.learnable_count();

        Self {
            learner: learner.clone(),
            completed_count,
            total_learnable,
            completion_percentage: percentage(
                u32::try_from(completed_count).unwrap_or(u32::MAX),
                u32::try_from(total_learnable).unwrap_or(u32::MAX),
            ),
            modules,
            last_accessed: record.map(LearnerRecord::last_accessed),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_learnable > 0 && self.completed_count == self.total_learnable
    }
}
