use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::fhir::ResourceTypeHint;
use crate::patient::{PatientId, PatientName};

/// Free-form metadata attached to indexed records and documents.
pub type Metadata = serde_json::Map<String, Value>;

/// A scored similarity-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub score: f32,
}

impl ResourceRecord {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
            score: 0.0,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Patient identifier stored under `field`, if present and usable.
    pub fn patient_id(&self, field: &str) -> Option<PatientId> {
        self.metadata.get(field).and_then(PatientId::from_metadata_value)
    }
}

/// Generic retrieval output: text plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Everything retrieval learned about one question, composed for a
/// downstream answering step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub patient_name: PatientName,
    pub resource_types: ResourceTypeHint,
    pub patient_id: PatientId,
    pub records: Vec<ResourceRecord>,
}

impl OutputDocument {
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn into_document(self) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("patient_name".into(), json!(self.patient_name));
        metadata.insert("patient_id".into(), json!(self.patient_id));
        metadata.insert("resource_types".into(), json!(self.resource_types.types()));
        metadata.insert("record_count".into(), json!(self.records.len()));
        Document {
            page_content: self.render(),
            metadata,
        }
    }
}

impl fmt::Display for OutputDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "The Patient name is {}", self.patient_name)?;
        writeln!(f, "FHIR Resource Type is {}", self.resource_types)?;
        writeln!(f, "Patient_ID={}", self.patient_id)?;
        write!(f, "Below is the medical information of {}:", self.patient_name)?;
        for record in &self.records {
            write!(f, "\n{}", record.content)?;
        }
        Ok(())
    }
}
