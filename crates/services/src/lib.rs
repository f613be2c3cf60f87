#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
mod locks;
pub mod progress_service;
pub mod session_service;
pub mod summary;
mod timeout;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ProgressError, SessionServiceError};
pub use progress_service::ProgressService;
pub use session_service::LearnerSessionService;
pub use summary::{ModuleProgress, ProgressSummary};
pub use timeout::DEFAULT_STORAGE_TIMEOUT;
