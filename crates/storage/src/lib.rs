#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CurrentLearnerRepository, InMemoryRepository, LearnerRecordRepository, Storage, StorageError,
    StorageErrorKind,
};
