//! Embedding provider seam and the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns text into vectors.
///
/// Implementations are shared across tasks, so they must be thread-safe.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for a batch of texts, one per input in order.
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Calls a JSON embedding endpoint: `POST {input, model, dimensions?}`
/// answered by `{embedding: [f32]}`.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    send_dimensions: bool,
    api_key: Option<String>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into(),
            model: model.into(),
            dimensions,
            send_dimensions: false,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Include the `dimensions` field in requests.
    pub fn with_send_dimensions(mut self, send: bool) -> Self {
        self.send_dimensions = send;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EmbeddingError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, EmbeddingError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
            dimensions: self.send_dimensions.then_some(self.dimensions),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(200).collect(),
            });
        }

        let parsed: EmbeddingResponse = serde_json::from_slice(&body)
            .map_err(|e| EmbeddingError::MalformedPayload(e.to_string()))?;
        if parsed.embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: parsed.embedding.len(),
            });
        }
        Ok(parsed.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
