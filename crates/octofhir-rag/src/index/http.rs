use std::time::Duration;

use async_trait::async_trait;
use octofhir_rag_core::ResourceRecord;
use serde::Deserialize;
use url::Url;

use super::{IndexError, SearchRequest, SimilaritySearch};

/// Client for a vector search service exposing `POST {base_url}/search`.
///
/// The request body is the serialized [`SearchRequest`]; the service answers
/// with `{"results": [{"content": ..., "metadata": {...}, "score": ...}]}`.
pub struct HttpSimilaritySearch {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ResourceRecord>,
}

impl HttpSimilaritySearch {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let base = base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/search")).map_err(|e| {
            IndexError::Configuration(format!("invalid index.base_url '{base_url}': {e}"))
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl SimilaritySearch for HttpSimilaritySearch {
    #[tracing::instrument(
        name = "index.search",
        skip_all,
        fields(k = request.k, min_score = request.min_score)
    )]
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ResourceRecord>, IndexError> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "similarity search rejected");
            return Err(IndexError::status(status.as_u16(), body));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| IndexError::InvalidResponse(e.to_string()))?;
        let received = parsed.results.len();
        // The service's own threshold and filter are not trusted.
        let results = request.select(parsed.results);
        tracing::debug!(received, hits = results.len(), "similarity search complete");
        Ok(results)
    }
}
