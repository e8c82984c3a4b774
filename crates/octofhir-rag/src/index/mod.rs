//! Similarity search seam and its backends.

mod http;
mod memory;

pub use http::HttpSimilaritySearch;
pub use memory::MemoryIndex;

use async_trait::async_trait;
use octofhir_rag_core::ResourceRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Errors raised by similarity search backends.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Transport failure talking to the search service.
    #[error("Similarity search request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Similarity search returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body was not the expected shape.
    #[error("Invalid similarity search response: {0}")]
    InvalidResponse(String),

    /// A fixtures file could not be parsed.
    #[error("Invalid fixtures in {path}: {message}")]
    Fixtures {
        /// File being loaded.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend misconfiguration (bad base URL and similar).
    #[error("Similarity search configuration error: {0}")]
    Configuration(String),
}

impl IndexError {
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn fixtures(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Fixtures {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Restricts results to records whose `namespace` metadata value is one of
/// `allow_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub namespace: String,
    pub allow_list: Vec<String>,
}

impl MetadataFilter {
    pub fn allow(
        namespace: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            allow_list: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        match record.metadata.get(&self.namespace) {
            Some(serde_json::Value::String(value)) => self.allow_list.iter().any(|v| v == value),
            Some(serde_json::Value::Number(value)) => {
                let value = value.to_string();
                self.allow_list.iter().any(|v| *v == value)
            }
            _ => false,
        }
    }
}

/// One similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Maximum number of results.
    pub k: usize,
    /// Minimum relevance score a result must reach, in `[0, 1]`.
    pub min_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<MetadataFilter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, k: usize, min_score: f32) -> Self {
        Self {
            query: query.into(),
            k,
            min_score,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether `record` clears the score threshold and passes the filter.
    pub fn admits(&self, record: &ResourceRecord) -> bool {
        record.score >= self.min_score
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(record))
    }

    /// Admitted records, best first, at most `k`. Equal scores keep their
    /// input order.
    pub fn select(&self, records: impl IntoIterator<Item = ResourceRecord>) -> Vec<ResourceRecord> {
        let mut hits: Vec<ResourceRecord> =
            records.into_iter().filter(|record| self.admits(record)).collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(self.k);
        hits
    }
}

/// Nearest-neighbour lookup over indexed FHIR resource text.
///
/// Implementations return at most `k` records scoring at least `min_score`,
/// best first, and only records passing the filter when one is given.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ResourceRecord>, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_rag_core::Metadata;
    use serde_json::json;

    fn record_with(field: &str, value: serde_json::Value) -> ResourceRecord {
        let mut metadata = Metadata::new();
        metadata.insert(field.into(), value);
        ResourceRecord::new("text", metadata)
    }

    #[test]
    fn test_filter_matches_allow_list() {
        let filter = MetadataFilter::allow("fhir_patient_id", ["patient-42"]);
        assert!(filter.matches(&record_with("fhir_patient_id", json!("patient-42"))));
        assert!(!filter.matches(&record_with("fhir_patient_id", json!("patient-7"))));
        assert!(!filter.matches(&record_with("other", json!("patient-42"))));
    }

    #[test]
    fn test_filter_matches_numeric_ids() {
        let filter = MetadataFilter::allow("fhir_patient_id", ["42"]);
        assert!(filter.matches(&record_with("fhir_patient_id", json!(42))));
        assert!(!filter.matches(&record_with("fhir_patient_id", json!(true))));
    }

    #[test]
    fn test_request_serialization() {
        let request = SearchRequest::new("q", 20, 0.75)
            .with_filter(MetadataFilter::allow("fhir_patient_id", ["p1"]));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["k"], json!(20));
        assert_eq!(value["filter"]["namespace"], json!("fhir_patient_id"));
        assert_eq!(value["filter"]["allow_list"], json!(["p1"]));

        let unfiltered = serde_json::to_value(SearchRequest::new("q", 1, 0.8)).unwrap();
        assert!(unfiltered.get("filter").is_none());
    }

    #[test]
    fn test_select_enforces_threshold_filter_order_and_k() {
        let request = SearchRequest::new("q", 2, 0.75)
            .with_filter(MetadataFilter::allow("fhir_patient_id", ["patient-42"]));
        let hits = request.select([
            record_with("fhir_patient_id", json!("patient-42")).with_score(0.8),
            record_with("fhir_patient_id", json!("patient-7")).with_score(0.99),
            record_with("fhir_patient_id", json!("patient-42")).with_score(0.5),
            record_with("fhir_patient_id", json!("patient-42")).with_score(0.95),
            record_with("fhir_patient_id", json!("patient-42")).with_score(0.75),
        ]);

        let scores: Vec<f32> = hits.iter().map(|hit| hit.score).collect();
        assert_eq!(scores, vec![0.95, 0.8]);
        assert!(hits.iter().all(|hit| request.admits(hit)));
    }
}
