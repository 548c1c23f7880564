//! Embedding service client over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};
use super::EmbeddingGateway;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<f32>,
}

/// Calls `GET <endpoint>?text=<urlencoded text>`.
pub struct HttpEmbeddingGateway {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpEmbeddingGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("embedding client: {e}")))?;
        Ok(Self { endpoint: endpoint.into(), client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self.client
            .get(&self.endpoint)
            .query(&[("text", text)])
            .send()
            .await
            .map_err(|e| Error::UpstreamDegraded(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamDegraded(format!("embedding service returned {status}")));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamDegraded(format!("unreadable embedding response: {e}")))?;
        Ok(body.embeddings)
    }

    fn name(&self) -> &str {
        "http"
    }
}
