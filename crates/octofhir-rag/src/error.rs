//! Retrieval error types.

use octofhir_rag_core::{CoreError, ErrorCategory};

use crate::index::IndexError;
use crate::llm::LlmError;

/// Errors that can end a retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// The query was empty or whitespace.
    #[error("Query must not be empty")]
    EmptyQuery,

    /// No patient name in the query and no fallback supplied one.
    #[error("No patient name could be identified in query: {query}")]
    UnresolvedPatientName {
        /// The query that was being processed.
        query: String,
    },

    /// No indexed patient cleared the relevance threshold for the name.
    #[error("Patient not found: {name}")]
    PatientNotFound {
        /// The extracted patient name.
        name: String,
    },

    /// The best patient match carries no usable identifier.
    #[error("Patient match has no '{field}' metadata")]
    MissingIdentifier {
        /// Metadata field that was expected.
        field: String,
    },

    /// The name fallback failed (as opposed to declining).
    #[error("Patient name fallback failed: {0}")]
    Fallback(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RetrieverError {
    #[must_use]
    pub fn unresolved_patient_name(query: impl Into<String>) -> Self {
        Self::UnresolvedPatientName {
            query: query.into(),
        }
    }

    #[must_use]
    pub fn patient_not_found(name: impl Into<String>) -> Self {
        Self::PatientNotFound { name: name.into() }
    }

    #[must_use]
    pub fn missing_identifier(field: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            field: field.into(),
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyQuery => ErrorCategory::Validation,
            Self::UnresolvedPatientName { .. } | Self::Fallback(_) => ErrorCategory::Unresolved,
            Self::PatientNotFound { .. } | Self::MissingIdentifier { .. } => {
                ErrorCategory::NotFound
            }
            Self::Llm(LlmError::Configuration(_)) | Self::Index(IndexError::Configuration(_)) => {
                ErrorCategory::Configuration
            }
            Self::Index(IndexError::Fixtures { .. } | IndexError::Io(_)) => {
                ErrorCategory::Configuration
            }
            Self::Llm(_) | Self::Index(_) => ErrorCategory::Upstream,
            Self::Core(err) => err.category(),
        }
    }
}
