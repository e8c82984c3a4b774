//! Patient names and identifiers as they flow through retrieval.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Sentinel the name-extraction prompt asks the model to answer with when
/// the question contains no names.
pub const NO_NAME_SENTINEL: &str = "None";

/// A patient name as extracted from a question, e.g. `Antone69` or
/// `Carmelo33 Reichert620`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientName(String);

impl PatientName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_patient_name(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatientName {
    type Error = CoreError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<PatientName> for String {
    fn from(name: PatientName) -> Self {
        name.0
    }
}

impl fmt::Display for PatientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of asking the model for the patient name in a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameExtraction {
    Resolved(PatientName),
    Unresolved,
}

impl NameExtraction {
    /// Interpret a raw completion. Surrounding whitespace, double quotes and
    /// backticks are dropped; an empty answer or the `None` sentinel (any
    /// case) is unresolved.
    pub fn from_model_output(raw: &str) -> Self {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '`')
            .trim();
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(NO_NAME_SENTINEL) {
            return Self::Unresolved;
        }
        match PatientName::new(cleaned) {
            Ok(name) => Self::Resolved(name),
            Err(_) => Self::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn into_name(self) -> Option<PatientName> {
        match self {
            Self::Resolved(name) => Some(name),
            Self::Unresolved => None,
        }
    }
}

/// Opaque key scoping resource records to one patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::invalid_patient_id(id));
        }
        Ok(Self(id))
    }

    /// Read an identifier out of a metadata value. Strings are taken as-is,
    /// numbers are rendered; anything else is rejected.
    pub fn from_metadata_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::new(s.clone()).ok(),
            serde_json::Value::Number(n) => Self::new(n.to_string()).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatientId {
    type Error = CoreError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
