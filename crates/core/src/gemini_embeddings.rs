use crate::embeddings::Embedder;
use crate::error::EmbedError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use url::Url;

pub const DEFAULT_GEMINI_EMBEDDING_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent";
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;
const EMBEDDING_MODEL: &str = "models/text-embedding-004";

#[derive(Debug, Clone)]
pub struct GeminiEmbedderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub dimensions: usize,
    pub concurrency: usize,
}

impl GeminiEmbedderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_EMBEDDING_ENDPOINT.to_string(),
            api_key: api_key.into(),
            dimensions: GEMINI_EMBEDDING_DIMENSIONS,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

pub struct GeminiEmbedder {
    url: Url,
    dimensions: usize,
    concurrency: usize,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiEmbedderConfig) -> Result<Self, EmbedError> {
        let url = Url::parse_with_params(&config.endpoint, &[("key", &config.api_key)])?;
        Ok(Self {
            url,
            dimensions: config.dimensions,
            concurrency: config.concurrency.max(1),
            client: Client::new(),
        })
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let payload = json!({
            "model": EMBEDDING_MODEL,
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "embedding endpoint error");
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|error| EmbedError::Inference(format!("invalid embedding response: {error}")))?;

        let values = parsed.embedding.values;
        if values.len() != self.dimensions {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimensions,
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        debug!(texts = texts.len(), limit = self.concurrency, "remote embedding");
        let requests: Vec<_> = texts.iter().map(|text| self.embed_text(text)).collect();
        stream::iter(requests)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn embedder_for(server: &MockServer, dimensions: usize) -> GeminiEmbedder {
        GeminiEmbedder::new(GeminiEmbedderConfig {
            endpoint: server.url("/v1beta/models/text-embedding-004:embedContent"),
            api_key: "secret".to_string(),
            dimensions,
            concurrency: 2,
        })
        .expect("mock endpoint is a valid url")
    }

    #[tokio::test]
    async fn vectors_come_back_in_input_order() {
        let server = MockServer::start_async().await;
        for (text, values) in [("alpha", [1.0, 0.0, 0.0]), ("beta", [0.0, 1.0, 0.0])] {
            server
                .mock_async(|when, then| {
                    when.method(POST)
                        .path("/v1beta/models/text-embedding-004:embedContent")
                        .query_param("key", "secret")
                        .json_body(json!({
                            "model": "models/text-embedding-004",
                            "content": { "parts": [{ "text": text }] }
                        }));
                    then.status(200)
                        .json_body(json!({ "embedding": { "values": values } }));
                })
                .await;
        }

        let embedder = embedder_for(&server, 3);
        let vectors = embedder
            .embed(&["alpha".to_string(), "beta".to_string()])
            .await
            .expect("embeddings");

        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn error_status_is_reported_as_upstream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(403).body("API key not valid");
            })
            .await;

        let error = embedder_for(&server, 3)
            .embed_one("alpha")
            .await
            .expect_err("403 should fail");

        assert!(error.is_upstream());
        assert!(matches!(error, EmbedError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn missing_values_are_an_inference_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "error": "nope" }));
            })
            .await;

        let error = embedder_for(&server, 3).embed_one("alpha").await.unwrap_err();
        assert!(matches!(error, EmbedError::Inference(_)));
    }

    #[tokio::test]
    async fn wrong_vector_width_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({ "embedding": { "values": [0.5, 0.5] } }));
            })
            .await;

        let error = embedder_for(&server, 3).embed_one("alpha").await.unwrap_err();
        assert!(matches!(
            error,
            EmbedError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn malformed_endpoint_fails_at_construction() {
        let mut config = GeminiEmbedderConfig::new("secret");
        config.endpoint = "::".to_string();
        assert!(matches!(
            GeminiEmbedder::new(config),
            Err(EmbedError::InvalidEndpoint(_))
        ));
    }
}
