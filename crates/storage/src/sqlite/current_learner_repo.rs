use async_trait::async_trait;
use progress_core::model::LearnerId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, learner_id_from_str, ser};
use crate::repository::{CurrentLearnerRepository, StorageError};

#[async_trait]
impl CurrentLearnerRepository for SqliteRepository {
    async fn get_current_learner(&self) -> Result<Option<LearnerId>, StorageError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT learner_id FROM current_learner WHERE slot = 1")
            .fetch_optional(pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let learner_id: Option<String> = row.try_get("learner_id").map_err(ser)?;
        learner_id.map(learner_id_from_str).transpose()
    }

    async fn set_current_learner(&self, id: Option<&LearnerId>) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        sqlx::query(
            r"
            INSERT INTO current_learner (slot, learner_id)
            VALUES (1, ?1)
            ON CONFLICT(slot) DO UPDATE SET
                learner_id = excluded.learner_id
            ",
        )
        .bind(id.map(LearnerId::as_str))
        .execute(pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
