use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::EmbeddingProvider;
use crate::core::errors::ApiError;

/// Embeddings via a local Ollama instance (`/api/embed`).
#[derive(Clone, Debug)]
pub struct OllamaEmbedding {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaEmbedding {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Internal("ollama returned no embedding".to_string()))
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "ollama embed error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let embeddings = payload["embeddings"]
            .as_array()
            .ok_or_else(|| ApiError::Internal("ollama embed response missing embeddings".to_string()))?
            .iter()
            .map(parse_vector)
            .collect();

        Ok(embeddings)
    }
}

fn parse_vector(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|vals| {
            vals.iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect()
        })
        .unwrap_or_default()
}
