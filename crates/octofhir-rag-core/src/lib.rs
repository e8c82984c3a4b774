pub mod document;
pub mod error;
pub mod fhir;
pub mod patient;

pub use document::{Document, Metadata, OutputDocument, ResourceRecord};
pub use error::{CoreError, ErrorCategory, Result};
pub use fhir::{R4_RESOURCE_TYPES, ResourceType, ResourceTypeHint, parse_resource_types};
pub use patient::{NO_NAME_SENTINEL, NameExtraction, PatientId, PatientName};
