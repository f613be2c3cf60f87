use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progress_core::model::{LearnerId, LearnerRecord, ModuleId, QuizResult};
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};

use super::SqliteRepository;
use super::mapping::{conn, learner_id_from_str, map_quiz_row, module_id_from_row, ser};
use crate::repository::{LearnerRecordRepository, StorageError};

#[async_trait]
impl LearnerRecordRepository for SqliteRepository {
    async fn get_record(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, StorageError> {
        let pool = self.pool().await?;
        // One read transaction so the three selects see the same snapshot.
        let mut tx = pool.begin().await.map_err(conn)?;

        let row = sqlx::query("SELECT id, last_accessed FROM learners WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_id = learner_id_from_str(row.try_get("id").map_err(ser)?)?;
        let last_accessed: DateTime<Utc> = row.try_get("last_accessed").map_err(ser)?;

        let completed: BTreeSet<ModuleId> = sqlx::query(
            r"
            SELECT module_id
            FROM completed_modules
            WHERE learner_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?
        .iter()
        .map(module_id_from_row)
        .collect::<Result<_, _>>()?;

        let scores: BTreeMap<ModuleId, QuizResult> = sqlx::query(
            r"
            SELECT module_id, score, total, taken_at
            FROM quiz_scores
            WHERE learner_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?
        .iter()
        .map(map_quiz_row)
        .collect::<Result<_, _>>()?;

        tx.commit().await.map_err(conn)?;

        LearnerRecord::from_persisted(stored_id, completed, scores, last_accessed)
            .map(Some)
            .map_err(ser)
    }

    async fn put_record(&self, record: &LearnerRecord) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let learner_id = record.id().as_str();
        let mut tx = pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO learners (id, last_accessed)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                last_accessed = excluded.last_accessed
            ",
        )
        .bind(learner_id)
        .bind(record.last_accessed())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM completed_modules WHERE learner_id = ?1")
            .bind(learner_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        sqlx::query("DELETE FROM quiz_scores WHERE learner_id = ?1")
            .bind(learner_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for module in record.completed_modules() {
            sqlx::query(
                r"
                INSERT INTO completed_modules (learner_id, module_id)
                VALUES (?1, ?2)
                ",
            )
            .bind(learner_id)
            .bind(module.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        for (module, result) in record.quiz_scores() {
            sqlx::query(
                r"
                INSERT INTO quiz_scores (
                    learner_id, module_id, score, total, percentage, passed, taken_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(learner_id)
            .bind(module.as_str())
            .bind(i64::from(result.score()))
            .bind(i64::from(result.total()))
            .bind(result.percentage())
            .bind(result.passed())
            .bind(result.taken_at())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
