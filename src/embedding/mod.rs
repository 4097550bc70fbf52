//! Embedding provider adapters.

mod ollama;
mod openai;

pub use ollama::OllamaEmbedding;
pub use openai::OpenAiEmbedding;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// Embed a batch of texts, one vector per input in order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Build the configured embedding provider. Unknown provider names and
/// missing credentials are configuration errors.
pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>, ApiError> {
    match config.embedding_provider.as_str() {
        "ollama" => {
            let base_url = config
                .embedding_base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            let model = config
                .embedding_model
                .clone()
                .unwrap_or_else(|| "nomic-embed-text".to_string());
            Ok(Arc::new(OllamaEmbedding::new(base_url, model)))
        }
        "openai" => {
            let api_key = config.embedding_api_key.clone().ok_or_else(|| {
                ApiError::BadRequest(
                    "EMBEDDING_API_KEY is required for the openai embedding provider".to_string(),
                )
            })?;
            let base_url = config
                .embedding_base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            let model = config
                .embedding_model
                .clone()
                .unwrap_or_else(|| "text-embedding-3-small".to_string());
            Ok(Arc::new(OpenAiEmbedding::new(base_url, model, api_key)))
        }
        other => Err(ApiError::BadRequest(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}
