use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RetrieverError;
use crate::index::{HttpSimilaritySearch, MemoryIndex, SimilaritySearch};
use crate::llm::{LanguageModel, OpenAiChatModel};
use crate::retriever::{PatientResourceRetriever, RetrieverSettings};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retriever: RetrieverSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RagConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // LLM validations
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url must not be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".into()));
        }
        if self.llm.timeout_ms == 0 || self.index.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0".into()));
        }
        // Index validations
        match self.index.backend {
            IndexBackend::Http if self.index.base_url.as_deref().unwrap_or("").is_empty() => {
                return Err(ConfigError::Invalid(
                    "index.backend=http requires index.base_url".into(),
                ));
            }
            IndexBackend::Memory if self.index.fixtures.is_none() => {
                return Err(ConfigError::Invalid(
                    "index.backend=memory requires index.fixtures".into(),
                ));
            }
            _ => {}
        }
        self.retriever.validate().map_err(ConfigError::Invalid)?;
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some("***".into());
        }
        if copy.index.api_key.is_some() {
            copy.index.api_key = Some("***".into());
        }
        copy
    }

    pub fn build_language_model(&self) -> Result<Arc<dyn LanguageModel>, RetrieverError> {
        Ok(Arc::new(OpenAiChatModel::new(&self.llm)?))
    }

    pub fn build_index(&self) -> Result<Arc<dyn SimilaritySearch>, RetrieverError> {
        let index: Arc<dyn SimilaritySearch> = match self.index.backend {
            IndexBackend::Http => Arc::new(HttpSimilaritySearch::new(
                self.index.base_url.as_deref().unwrap_or_default(),
                self.index.api_key.clone(),
                Duration::from_millis(self.index.timeout_ms),
            )?),
            IndexBackend::Memory => {
                let path = self.index.fixtures.as_ref().ok_or_else(|| {
                    crate::index::IndexError::Configuration(
                        "index.backend=memory requires index.fixtures".into(),
                    )
                })?;
                Arc::new(MemoryIndex::load_fixtures(path)?)
            }
        };
        Ok(index)
    }

    /// Wire the configured backends into a retriever.
    pub fn build_retriever(&self) -> Result<PatientResourceRetriever, RetrieverError> {
        Ok(
            PatientResourceRetriever::new(self.build_language_model()?, self.build_index()?)
                .with_settings(self.retriever.clone()),
        )
    }
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Prefer OCTOFHIR_RAG__LLM__API_KEY over writing the key to a file
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            temperature: 0.0,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Http,
    Memory,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::Http => write!(f, "http"),
            IndexBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackend,
    /// Search service base URL (http backend)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// JSON or NDJSON records file (memory backend)
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Http,
            base_url: None,
            api_key: None,
            fixtures: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{ConfigError, RagConfig};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "octofhir-rag.toml";
    pub const ENV_PREFIX: &str = "OCTOFHIR_RAG";

    pub fn load_config(path: Option<&str>) -> Result<RagConfig, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(ConfigError::Build(format!("config file not found: {p}")));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., OCTOFHIR_RAG__LLM__MODEL=gpt-4o
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Build(e.to_string()))?;
        let merged: RagConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Build(format!("deserialize: {e}")))?;
        merged.validate()?;
        tracing::debug!(
            backend = %merged.index.backend,
            model = %merged.llm.model,
            "configuration loaded"
        );
        Ok(merged)
    }

    pub fn load_config_from_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<RagConfig, ConfigError> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
