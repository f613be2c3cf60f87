#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod time;

pub use catalog::{Catalog, CatalogError, ModuleEntry, ModuleKind};
pub use time::Clock;
