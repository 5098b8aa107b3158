//! Embedding generation using the Voyage AI multimodal embeddings API

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::image_prep::{self, ImageLimits};
use crate::{Config, PicsearchError, Result};

/// Produces vectors for images and text queries in a shared embedding space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed an image file for storage.
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>>;

    /// Embed a free-text search query.
    async fn embed_text(&self, query: &str) -> Result<Vec<f32>>;
}

/// Voyage AI multimodal embedding client.
pub struct VoyageEmbedder {
    api_key: String,
    model: String,
    endpoint: String,
    dimension: usize,
    limits: ImageLimits,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum InputType {
    Document,
    Query,
}

#[derive(Serialize)]
struct MultimodalRequest<'a> {
    inputs: Vec<MultimodalInput<'a>>,
    model: &'a str,
    input_type: InputType,
}

#[derive(Serialize)]
struct MultimodalInput<'a> {
    content: Vec<ContentPiece<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPiece<'a> {
    Text { text: &'a str },
    ImageBase64 { image_base64: &'a str },
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    detail: String,
}

impl VoyageEmbedder {
    /// Create a new client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("picsearch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_key: config.voyage_api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/multimodalembeddings", config.voyage_base_url),
            dimension: config.dimension,
            limits: ImageLimits::from(config),
            http_client,
        })
    }

    async fn embed_one(&self, piece: ContentPiece<'_>, input_type: InputType) -> Result<Vec<f32>> {
        let request = MultimodalRequest {
            inputs: vec![MultimodalInput {
                content: vec![piece],
            }],
            model: &self.model,
            input_type,
        };

        tracing::debug!("POST {} ({:?})", self.endpoint, input_type);

        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PicsearchError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let response: EmbeddingResponse = resp.json().await?;
        first_embedding(response, self.dimension)
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        let encoded = image_prep::encode_file(path, &self.limits)?;
        self.embed_one(
            ContentPiece::ImageBase64 {
                image_base64: &encoded.data_url,
            },
            InputType::Document,
        )
        .await
    }

    async fn embed_text(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_one(ContentPiece::Text { text: query }, InputType::Query)
            .await
    }
}

/// Pull the single vector out of a response and check its length.
fn first_embedding(response: EmbeddingResponse, dimension: usize) -> Result<Vec<f32>> {
    let embedding = response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .ok_or_else(|| PicsearchError::Embedding("No embedding returned".to_string()))?;

    if embedding.len() != dimension {
        return Err(PicsearchError::Embedding(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            dimension,
            embedding.len()
        )));
    }

    Ok(embedding)
}

/// Extract `detail` from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => err.detail,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_serialization() {
        let req = MultimodalRequest {
            inputs: vec![MultimodalInput {
                content: vec![ContentPiece::Text { text: "red car" }],
            }],
            model: "voyage-multimodal-3.5",
            input_type: InputType::Query,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "voyage-multimodal-3.5");
        assert_eq!(json["input_type"], "query");
        assert_eq!(json["inputs"][0]["content"][0]["type"], "text");
        assert_eq!(json["inputs"][0]["content"][0]["text"], "red car");
    }

    #[test]
    fn test_image_request_serialization() {
        let req = MultimodalRequest {
            inputs: vec![MultimodalInput {
                content: vec![ContentPiece::ImageBase64 {
                    image_base64: "data:image/jpeg;base64,AAAA",
                }],
            }],
            model: "voyage-multimodal-3.5",
            input_type: InputType::Document,
        };
        let json = serde_json::to_value(&req).unwrap();
        let piece = &json["inputs"][0]["content"][0];
        assert_eq!(json["input_type"], "document");
        assert_eq!(piece["type"], "image_base64");
        assert_eq!(piece["image_base64"], "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": 0}
            ],
            "model": "voyage-multimodal-3.5",
            "usage": {"text_tokens": 3, "image_pixels": 0, "total_tokens": 3}
        }"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        let embedding = first_embedding(resp, 3).unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let resp = EmbeddingResponse {
            data: vec![EmbeddingData {
                embedding: vec![0.0; 4],
                index: 0,
            }],
        };
        let result = first_embedding(resp, 1024);
        assert!(matches!(result, Err(PicsearchError::Embedding(_))));
    }

    #[test]
    fn test_empty_response() {
        let resp = EmbeddingResponse { data: vec![] };
        assert!(first_embedding(resp, 3).is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"detail": "Provided API key is invalid."}"#),
            "Provided API key is invalid."
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
    }
}
