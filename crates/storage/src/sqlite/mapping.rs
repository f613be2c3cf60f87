use progress_core::model::{LearnerId, ModuleId, QuizResult};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn learner_id_from_str(raw: String) -> Result<LearnerId, StorageError> {
    LearnerId::new(raw).map_err(ser)
}

pub(crate) fn module_id_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ModuleId, StorageError> {
    let raw: String = row.try_get("module_id").map_err(ser)?;
    ModuleId::new(raw).map_err(ser)
}

/// Rebuilds a quiz result from its stored score and total.
///
/// `percentage` and `passed` columns are informational; they are re-derived here so a
/// stale row can never disagree with the scoring rules.
pub(crate) fn map_quiz_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(ModuleId, QuizResult), StorageError> {
    let module = module_id_from_row(row)?;
    let score: i64 = row.try_get("score").map_err(ser)?;
    let total: i64 = row.try_get("total").map_err(ser)?;
    let taken_at = row.try_get("taken_at").map_err(ser)?;
    let result = QuizResult::new(score, total, taken_at).map_err(ser)?;
    Ok((module, result))
}
