use std::sync::Arc;
use std::time::Duration;

use progress_core::Catalog;
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::session_service::LearnerSessionService;
use crate::timeout::DEFAULT_STORAGE_TIMEOUT;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    sessions: Arc<LearnerSessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// The database is opened eagerly so a broken store is reported at startup; later
    /// calls still retry initialization on their own.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Catalog,
        storage_timeout: Duration,
    ) -> Result<Self, AppServicesError> {
        let repo = SqliteRepository::new(db_url);
        repo.init().await?;
        let storage = Storage::from_sqlite(repo);
        Ok(Self::from_storage(&storage, clock, catalog, storage_timeout))
    }

    /// Build services backed by process-local memory.
    #[must_use]
    pub fn in_memory(clock: Clock, catalog: Catalog) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, catalog, DEFAULT_STORAGE_TIMEOUT)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        catalog: Catalog,
        storage_timeout: Duration,
    ) -> Self {
        let progress = Arc::new(
            ProgressService::new(clock, Arc::clone(&storage.records), Arc::new(catalog))
                .with_storage_timeout(storage_timeout),
        );
        let sessions = Arc::new(
            LearnerSessionService::new(Arc::clone(&storage.current_learner))
                .with_storage_timeout(storage_timeout),
        );
        Self { progress, sessions }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<LearnerSessionService> {
        Arc::clone(&self.sessions)
    }
}
