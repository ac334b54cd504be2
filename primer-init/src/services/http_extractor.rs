//! Remote extraction over HTTP
//!
//! POSTs `{path, content, maxLength}` as JSON and expects `ExtractedFacts`
//! back. A `null` body is an explicit empty result.

use super::content_extractor::{ContentExtractor, ExtractionError, ExtractionRequest};
use crate::models::ExtractedFacts;
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = concat!("primer/", env!("CARGO_PKG_VERSION"));

pub struct HttpExtractor {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    /// `timeout` bounds a single request; the pipeline applies its own
    /// per-file timeout on top.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExtractionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        tracing::debug!(file = %request.path, endpoint = %self.endpoint, "Requesting remote extraction");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api(status.as_u16(), body));
        }

        let facts: Option<ExtractedFacts> = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        Ok(facts.unwrap_or_default())
    }
}
