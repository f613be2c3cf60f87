use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier chosen by a learner (the "pseudoid").
///
/// Opaque and case-sensitive. The value is kept verbatim; only blank input is rejected.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LearnerId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerIdError {
    #[error("learner id cannot be empty")]
    Empty,
}

impl LearnerId {
    /// Creates a new `LearnerId`
    ///
    /// # Errors
    ///
    /// Returns `LearnerIdError::Empty` if the id is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, LearnerIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LearnerIdError::Empty);
        }
        Ok(Self(id))
    }

    /// Returns the underlying string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a lesson module (e.g. `hashing`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleIdError {
    #[error("module id cannot be empty")]
    Empty,
}

impl ModuleId {
    /// Creates a new `ModuleId`
    ///
    /// # Errors
    ///
    /// Returns `ModuleIdError::Empty` if the id is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ModuleIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ModuleIdError::Empty);
        }
        Ok(Self(id))
    }

    // Only for ids known to be non-blank at compile time.
    pub(crate) fn from_static(id: &'static str) -> Self {
        Self(id.to_owned())
    }

    /// Returns the underlying string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<String> for LearnerId {
    type Error = LearnerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LearnerId> for String {
    fn from(id: LearnerId) -> Self {
        id.0
    }
}

impl TryFrom<String> for ModuleId {
    type Error = ModuleIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for LearnerId {
    type Err = LearnerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ModuleId {
    type Err = ModuleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Debug / Display ───────────────────────────────────────────────────────────

impl fmt::Debug for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LearnerId({:?})", self.0)
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({:?})", self.0)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learner_id_rejects_blank() {
        assert_eq!(LearnerId::new(""), Err(LearnerIdError::Empty));
        assert_eq!(LearnerId::new("   "), Err(LearnerIdError::Empty));
    }

    #[test]
    fn learner_id_is_case_sensitive_and_verbatim() {
        let lower = LearnerId::new("abc123").unwrap();
        let upper = LearnerId::new("ABC123").unwrap();
        assert_ne!(lower, upper);

        let padded = LearnerId::new(" abc ").unwrap();
        assert_eq!(padded.as_str(), " abc ");
    }

    #[test]
    fn module_id_from_str() {
        let id: ModuleId = "hashing".parse().unwrap();
        assert_eq!(id.to_string(), "hashing");
        assert!("".parse::<ModuleId>().is_err());
    }

    #[test]
    fn deserialize_rejects_empty_ids() {
        let err = serde_json::from_str::<ModuleId>("\"\"");
        assert!(err.is_err());
        let ok: LearnerId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(ok.as_str(), "abc123");
    }
}
