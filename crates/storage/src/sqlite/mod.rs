use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::repository::{CurrentLearnerRepository, LearnerRecordRepository, Storage, StorageError};

mod current_learner_repo;
mod learner_repo;
mod mapping;
mod migrate;

/// `SQLite`-backed store.
///
/// The pool is opened and migrated on first use. Concurrent first calls share a single
/// initialization attempt; a failed attempt leaves the repository uninitialized so the
/// next call tries again.
#[derive(Clone)]
pub struct SqliteRepository {
    database_url: Arc<str>,
    pool: Arc<OnceCell<SqlitePool>>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Create a repository for `database_url` without touching the database yet.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        let database_url: String = database_url.into();
        Self {
            database_url: Arc::from(database_url),
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Connect to `SQLite` using the given URL and run migrations immediately.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or the schema
    /// cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::new(database_url);
        repo.init().await?;
        Ok(repo)
    }

    /// Open and migrate the database if that has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection or migrations fail.
    pub async fn init(&self) -> Result<&SqlitePool, SqliteInitError> {
        self.pool
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.database_url, "opening sqlite store");
                let pool = open_pool(&self.database_url).await?;
                migrate::run_migrations(&pool).await?;
                Ok::<_, SqliteInitError>(pool)
            })
            .await
            .inspect_err(|err| {
                tracing::warn!(url = %self.database_url, error = %err, "sqlite store unavailable");
            })
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    pub(crate) async fn pool(&self) -> Result<&SqlitePool, StorageError> {
        self.init()
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }
}

async fn open_pool(database_url: &str) -> Result<SqlitePool, SqliteInitError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA journal_mode = WAL;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA busy_timeout = 5000;")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await?;
    Ok(pool)
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// The database is opened lazily; use [`SqliteRepository::init`] first to fail fast.
    #[must_use]
    pub fn sqlite(database_url: &str) -> Self {
        Self::from_sqlite(SqliteRepository::new(database_url))
    }

    #[must_use]
    pub fn from_sqlite(repo: SqliteRepository) -> Self {
        let records: Arc<dyn LearnerRecordRepository> = Arc::new(repo.clone());
        let current_learner: Arc<dyn CurrentLearnerRepository> = Arc::new(repo);
        Self {
            records,
            current_learner,
        }
    }
}
