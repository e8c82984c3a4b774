//! Patient-scoped FHIR resource retrieval for question answering.
//!
//! A question such as "What medications is Antone69 allergic to?" is turned
//! into a single text document holding the patient's name, identifier, the
//! FHIR resource types the question is about, and the matching indexed
//! resource records. Language model and similarity index are pluggable via
//! [`LanguageModel`] and [`SimilaritySearch`].

pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod observability;
pub mod prompts;
pub mod retriever;

pub use config::{ConfigError, IndexBackend, RagConfig};
pub use error::RetrieverError;
pub use index::{
    HttpSimilaritySearch, IndexError, MemoryIndex, MetadataFilter, SearchRequest, SimilaritySearch,
};
pub use llm::{LanguageModel, LlmError, OpenAiChatModel};
pub use retriever::{
    DEFAULT_PATIENT_ID_FIELD, DocumentRetriever, NameFallback, PatientResourceRetriever,
    RetrieverSettings,
};
