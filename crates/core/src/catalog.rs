use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ModuleId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate module id: {0}")]
    DuplicateModule(ModuleId),

    #[error("module {0} has an empty title")]
    EmptyTitle(ModuleId),
}

/// Role a module plays in the hub.
///
/// Only `Lesson` modules count towards completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Landing,
    #[default]
    Lesson,
    Profile,
}

/// Catalog entry describing one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    id: ModuleId,
    title: String,
    #[serde(default)]
    has_quiz: bool,
    #[serde(default)]
    kind: ModuleKind,
}

impl ModuleEntry {
    #[must_use]
    pub fn new(id: ModuleId, title: impl Into<String>, has_quiz: bool, kind: ModuleKind) -> Self {
        Self {
            id,
            title: title.into(),
            has_quiz,
            kind,
        }
    }

    #[must_use]
    pub fn lesson(id: ModuleId, title: impl Into<String>, has_quiz: bool) -> Self {
        Self::new(id, title, has_quiz, ModuleKind::Lesson)
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        self.has_quiz
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    #[must_use]
    pub fn is_learnable(&self) -> bool {
        self.kind == ModuleKind::Lesson
    }
}

/// Read-only list of modules, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ModuleEntry>,
}

impl Catalog {
    /// Build a catalog from entries in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateModule` if two entries share an id, or
    /// `CatalogError::EmptyTitle` if a title is blank.
    pub fn new(entries: Vec<ModuleEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.title.trim().is_empty() {
                return Err(CatalogError::EmptyTitle(entry.id.clone()));
            }
            if !seen.insert(&entry.id) {
                return Err(CatalogError::DuplicateModule(entry.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Modules shipped with the hub.
    #[must_use]
    pub fn builtin() -> Self {
        let entry = |id: &'static str, title: &'static str, has_quiz, kind| ModuleEntry {
            id: ModuleId::from_static(id),
            title: title.to_owned(),
            has_quiz,
            kind,
        };
        Self {
            entries: vec![
                entry("home", "Welcome!", false, ModuleKind::Landing),
                entry("encryption", "Encryption Basics", false, ModuleKind::Lesson),
                entry(
                    "encryption-types",
                    "Symmetric and Asymmetric Encryption",
                    true,
                    ModuleKind::Lesson,
                ),
                entry("compression", "Data Compression", true, ModuleKind::Lesson),
                entry("hashing", "Hashing and Data Integrity", true, ModuleKind::Lesson),
                entry("profile", "Your Progress", false, ModuleKind::Profile),
            ],
        }
    }

    #[must_use]
    pub fn get(&self, id: &ModuleId) -> Option<&ModuleEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    #[must_use]
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// Modules that count towards completion, in display order.
    pub fn learnable(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.entries.iter().filter(|entry| entry.is_learnable())
    }

    #[must_use]
    pub fn learnable_count(&self) -> usize {
        self.learnable().count()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
