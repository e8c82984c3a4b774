use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use octofhir_rag_core::ResourceRecord;

use super::{IndexError, SearchRequest, SimilaritySearch};

/// In-process similarity index over resource text.
///
/// Scores are the cosine similarity of lower-cased alphanumeric term
/// frequencies, so identical text scores 1.0 and disjoint text 0.0. Records
/// with no term in common with the query are never returned.
#[derive(Debug)]
pub struct MemoryIndex {
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    record: ResourceRecord,
    terms: HashMap<String, f32>,
    norm: f32,
}

impl Entry {
    fn new(record: ResourceRecord) -> Self {
        let terms = term_frequencies(&record.content);
        let norm = vector_norm(&terms);
        Self { record, terms, norm }
    }
}

impl MemoryIndex {
    pub fn from_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        Self {
            entries: records.into_iter().map(Entry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load records from a JSON array or newline-delimited JSON file.
    pub fn load_fixtures(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let trimmed = content.trim_start();

        let records: Vec<ResourceRecord> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).map_err(|e| IndexError::fixtures(path, e.to_string()))?
        } else {
            let mut records = Vec::new();
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str(line)
                    .map_err(|e| IndexError::fixtures(path, format!("line {}: {e}", lineno + 1)))?;
                records.push(record);
            }
            records
        };

        tracing::info!(path = %path.display(), records = records.len(), "loaded index fixtures");
        Ok(Self::from_records(records))
    }
}

#[async_trait]
impl SimilaritySearch for MemoryIndex {
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ResourceRecord>, IndexError> {
        let query_terms = term_frequencies(&request.query);
        let query_norm = vector_norm(&query_terms);

        let scored = self.entries.iter().filter_map(|entry| {
            let score = cosine(&query_terms, query_norm, &entry.terms, entry.norm);
            (score > 0.0).then(|| entry.record.clone().with_score(score))
        });
        let hits = request.select(scored);
        tracing::debug!(
            hits = hits.len(),
            candidates = self.entries.len(),
            "memory search complete"
        );
        Ok(hits)
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut terms = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        *terms.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn vector_norm(terms: &HashMap<String, f32>) -> f32 {
    terms.values().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(a: &HashMap<String, f32>, a_norm: f32, b: &HashMap<String, f32>, b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f32 = small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum();
    (dot / (a_norm * b_norm)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MetadataFilter;
    use octofhir_rag_core::Metadata;
    use serde_json::json;
    use std::io::Write;
    use tokio_test::block_on;

    fn record(content: &str, patient: &str) -> ResourceRecord {
        let mut metadata = Metadata::new();
        metadata.insert("fhir_patient_id".into(), json!(patient));
        ResourceRecord::new(content, metadata)
    }

    fn index() -> MemoryIndex {
        MemoryIndex::from_records([
            record("patient Antone69 allergy peanut", "patient-42"),
            record("patient Babara869 height observation", "patient-7"),
            record("patient Antone69 allergy peanut", "patient-7"),
        ])
    }

    #[test]
    fn test_term_frequencies() {
        let terms = term_frequencies("Babara869's height, height!");
        assert_eq!(terms.get("babara869"), Some(&1.0));
        assert_eq!(terms.get("s"), Some(&1.0));
        assert_eq!(terms.get("height"), Some(&2.0));
    }

    #[test]
    fn test_cosine_bounds() {
        let a = term_frequencies("blood pressure reading");
        let b = term_frequencies("blood pressure reading");
        let c = term_frequencies("immunization history");
        assert!(cosine(&a, vector_norm(&a), &b, vector_norm(&b)) > 0.999);
        assert_eq!(cosine(&a, vector_norm(&a), &c, vector_norm(&c)), 0.0);
        assert_eq!(cosine(&a, vector_norm(&a), &HashMap::new(), 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_by_score() {
        let hits = index()
            .similarity_search(&SearchRequest::new("Antone69 allergy", 10, 0.0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.content.contains("Antone69")));
        assert!((hits[0].score - 0.7071).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_search_applies_threshold() {
        let hits = index()
            .similarity_search(&SearchRequest::new("Antone69 allergy", 10, 0.8))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_applies_filter() {
        let request = SearchRequest::new("Antone69 allergy", 10, 0.0)
            .with_filter(MetadataFilter::allow("fhir_patient_id", ["patient-42"]));
        let hits = index().similarity_search(&request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata["fhir_patient_id"], json!("patient-42"));
    }

    #[test]
    fn test_search_truncates_to_k_keeping_insertion_order_on_ties() {
        let index = index();
        block_on(async {
            let hits = index
                .similarity_search(&SearchRequest::new("patient", 1, 0.0))
                .await
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].metadata["fhir_patient_id"], json!("patient-42"));
        });
    }

    #[test]
    fn test_load_fixtures_ndjson() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"content": "a", "metadata": {{"fhir_patient_id": "p1"}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"content": "b"}}"#).unwrap();

        let index = MemoryIndex::load_fixtures(file.path()).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_load_fixtures_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"  [{{"content": "a"}}, {{"content": "b"}}, {{"content": "c"}}]"#).unwrap();

        let index = MemoryIndex::load_fixtures(file.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_load_fixtures_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"content": "a"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        match MemoryIndex::load_fixtures(file.path()) {
            Err(IndexError::Fixtures { message, .. }) => assert!(message.starts_with("line 2")),
            other => panic!("expected fixtures error, got {other:?}"),
        }
    }
}
