//! Patient-scoped FHIR resource retrieval.
//!
//! [`PatientResourceRetriever`] turns a free-text clinical question into the
//! resource records of one patient:
//!
//! 1. the language model extracts the patient name,
//! 2. the language model guesses the relevant FHIR resource types,
//! 3. a top-1 similarity search maps the name to a patient identifier,
//! 4. a filtered similarity search fetches that patient's records.
//!
//! Each step is a single request with no retries or caching. An unresolved
//! name is handed to an optional [`NameFallback`]; without one, retrieval
//! fails with [`RetrieverError::UnresolvedPatientName`].

use std::sync::Arc;

use async_trait::async_trait;
use octofhir_rag_core::{
    Document, NameExtraction, OutputDocument, PatientId, PatientName, ResourceRecord,
    ResourceTypeHint,
};
use serde::{Deserialize, Serialize};

use crate::error::RetrieverError;
use crate::index::{MetadataFilter, SearchRequest, SimilaritySearch};
use crate::llm::LanguageModel;
use crate::prompts;

/// Metadata field holding the patient identifier on indexed records.
pub const DEFAULT_PATIENT_ID_FIELD: &str = "fhir_patient_id";

/// Search limits and thresholds for the two similarity lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverSettings {
    #[serde(default = "default_patient_top_k")]
    pub patient_top_k: usize,
    #[serde(default = "default_patient_min_score")]
    pub patient_min_score: f32,
    #[serde(default = "default_resource_top_k")]
    pub resource_top_k: usize,
    #[serde(default = "default_resource_min_score")]
    pub resource_min_score: f32,
    #[serde(default = "default_patient_id_field")]
    pub patient_id_field: String,
}

fn default_patient_top_k() -> usize {
    1
}
fn default_patient_min_score() -> f32 {
    0.8
}
fn default_resource_top_k() -> usize {
    20
}
fn default_resource_min_score() -> f32 {
    0.75
}
fn default_patient_id_field() -> String {
    DEFAULT_PATIENT_ID_FIELD.to_string()
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            patient_top_k: default_patient_top_k(),
            patient_min_score: default_patient_min_score(),
            resource_top_k: default_resource_top_k(),
            resource_min_score: default_resource_min_score(),
            patient_id_field: default_patient_id_field(),
        }
    }
}

impl RetrieverSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_top_k == 0 || self.resource_top_k == 0 {
            return Err("retriever top_k values must be > 0".into());
        }
        for (key, score) in [
            ("retriever.patient_min_score", self.patient_min_score),
            ("retriever.resource_min_score", self.resource_min_score),
        ] {
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("{key} must be within [0, 1]"));
            }
        }
        if self.patient_id_field.trim().is_empty() {
            return Err("retriever.patient_id_field must not be empty".into());
        }
        Ok(())
    }
}

/// Decides what happens when no patient name can be read from a query.
#[async_trait]
pub trait NameFallback: Send + Sync {
    /// Supply a name for `query`, or decline with `None`.
    async fn patient_name(&self, query: &str) -> Result<Option<PatientName>, RetrieverError>;
}

/// Anything that answers a query with documents.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>, RetrieverError>;
}

/// Retrieves one patient's FHIR resource records for a clinical question.
pub struct PatientResourceRetriever {
    llm: Arc<dyn LanguageModel>,
    index: Arc<dyn SimilaritySearch>,
    settings: RetrieverSettings,
    fallback: Option<Arc<dyn NameFallback>>,
}

impl PatientResourceRetriever {
    pub fn new(llm: Arc<dyn LanguageModel>, index: Arc<dyn SimilaritySearch>) -> Self {
        Self {
            llm,
            index,
            settings: RetrieverSettings::default(),
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RetrieverSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn NameFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    /// Run the full pipeline for `query`.
    #[tracing::instrument(
        name = "retriever.retrieve",
        skip(self),
        fields(patient_id = tracing::field::Empty)
    )]
    pub async fn retrieve(&self, query: &str) -> Result<OutputDocument, RetrieverError> {
        let query = non_empty(query)?;

        let patient_name = match self.extract_patient_name(query).await? {
            NameExtraction::Resolved(name) => name,
            NameExtraction::Unresolved => self.fallback_name(query).await?,
        };
        let resource_types = self.extract_resource_type_hint(query).await?;
        let patient_id = self.resolve_patient_identifier(&patient_name).await?;
        tracing::Span::current().record("patient_id", patient_id.as_str());

        let records = self
            .fetch_resources(query, &resource_types, &patient_id)
            .await?;

        Ok(OutputDocument {
            patient_name,
            resource_types,
            patient_id,
            records,
        })
    }

    async fn fallback_name(&self, query: &str) -> Result<PatientName, RetrieverError> {
        let Some(fallback) = &self.fallback else {
            return Err(RetrieverError::unresolved_patient_name(query));
        };
        tracing::info!("no patient name in query, consulting fallback");
        fallback
            .patient_name(query)
            .await?
            .ok_or_else(|| RetrieverError::unresolved_patient_name(query))
    }

    /// Ask the model for the patient name mentioned in `query`.
    #[tracing::instrument(name = "retriever.extract_patient_name", skip_all)]
    pub async fn extract_patient_name(
        &self,
        query: &str,
    ) -> Result<NameExtraction, RetrieverError> {
        let query = non_empty(query)?;
        let answer = self.llm.complete(prompts::PATIENT_NAME_SYSTEM, query).await?;
        let extraction = NameExtraction::from_model_output(&answer);
        match &extraction {
            NameExtraction::Resolved(name) => tracing::debug!(%name, "patient name extracted"),
            NameExtraction::Unresolved => {
                tracing::debug!(answer = answer.trim(), "model found no patient name")
            }
        }
        Ok(extraction)
    }

    /// Ask the model which FHIR resource types `query` is about.
    #[tracing::instrument(name = "retriever.extract_resource_types", skip_all)]
    pub async fn extract_resource_type_hint(
        &self,
        query: &str,
    ) -> Result<ResourceTypeHint, RetrieverError> {
        let query = non_empty(query)?;
        let answer = self.llm.complete(prompts::RESOURCE_TYPE_SYSTEM, query).await?;
        let hint = ResourceTypeHint::from_model_output(answer);
        if hint.is_unfiltered() {
            tracing::debug!(raw = hint.raw(), "no known resource types, fetching unfiltered");
        } else {
            tracing::debug!(types = %hint, "resource types inferred");
        }
        Ok(hint)
    }

    /// Map a patient name to the identifier of the best-matching indexed
    /// patient entry.
    #[tracing::instrument(name = "retriever.resolve_patient", skip_all, fields(name = %name))]
    pub async fn resolve_patient_identifier(
        &self,
        name: &PatientName,
    ) -> Result<PatientId, RetrieverError> {
        let request = SearchRequest::new(
            prompts::patient_lookup_query(name),
            self.settings.patient_top_k,
            self.settings.patient_min_score,
        );
        let hits = self.index.similarity_search(&request).await?;

        let Some(top) = hits.first() else {
            tracing::warn!(
                min_score = self.settings.patient_min_score,
                "no patient entry above threshold"
            );
            return Err(RetrieverError::patient_not_found(name.as_str()));
        };
        let field = &self.settings.patient_id_field;
        let patient_id = top
            .patient_id(field)
            .ok_or_else(|| RetrieverError::missing_identifier(field.as_str()))?;

        tracing::info!(patient_id = %patient_id, score = top.score, "patient resolved");
        Ok(patient_id)
    }

    /// Fetch records for `patient_id` relevant to `query`, steered by `hint`.
    #[tracing::instrument(
        name = "retriever.fetch_resources",
        skip_all,
        fields(patient_id = %patient_id)
    )]
    pub async fn fetch_resources(
        &self,
        query: &str,
        hint: &ResourceTypeHint,
        patient_id: &PatientId,
    ) -> Result<Vec<ResourceRecord>, RetrieverError> {
        let request = SearchRequest::new(
            prompts::resource_query(query, hint),
            self.settings.resource_top_k,
            self.settings.resource_min_score,
        )
        .with_filter(MetadataFilter::allow(
            self.settings.patient_id_field.as_str(),
            [patient_id.as_str()],
        ));
        let records = self.index.similarity_search(&request).await?;

        if records.is_empty() {
            tracing::warn!(types = %hint, "no resource records matched");
        } else {
            tracing::info!(count = records.len(), "resource records fetched");
        }
        Ok(records)
    }
}

#[async_trait]
impl DocumentRetriever for PatientResourceRetriever {
    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        let output = self.retrieve(query).await?;
        Ok(vec![output.into_document()])
    }
}

fn non_empty(query: &str) -> Result<&str, RetrieverError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(RetrieverError::EmptyQuery);
    }
    Ok(trimmed)
}
