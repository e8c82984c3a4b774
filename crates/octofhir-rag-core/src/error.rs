use thiserror::Error;

/// Core error types for retrieval domain values
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid FHIR resource type: {0}")]
    InvalidResourceType(String),

    #[error("Invalid patient name: {0}")]
    InvalidPatientName(String),

    #[error("Invalid patient identifier: {0}")]
    InvalidPatientId(String),
}

impl CoreError {
    /// Create a new InvalidResourceType error
    pub fn invalid_resource_type(resource_type: impl Into<String>) -> Self {
        Self::InvalidResourceType(resource_type.into())
    }

    /// Create a new InvalidPatientName error
    pub fn invalid_patient_name(name: impl Into<String>) -> Self {
        Self::InvalidPatientName(name.into())
    }

    /// Create a new InvalidPatientId error
    pub fn invalid_patient_id(id: impl Into<String>) -> Self {
        Self::InvalidPatientId(id.into())
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidResourceType(_)
            | Self::InvalidPatientName(_)
            | Self::InvalidPatientId(_) => ErrorCategory::Validation,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Unresolved,
    Upstream,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unresolved => write!(f, "unresolved"),
            Self::Upstream => write!(f, "upstream"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
