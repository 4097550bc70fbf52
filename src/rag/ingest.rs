//! Document ingestion: chunk, embed, insert.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use super::chunker::{split_text, ChunkerConfig};
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::vectorstore::VectorStore;

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: ChunkerConfig,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        chunker: ChunkerConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
        }
    }

    /// Split `text` into chunks, embed them in one batch and insert them
    /// into the collection. Returns the generated record ids.
    pub async fn ingest(
        &self,
        text: &str,
        metadata: Option<Value>,
        collection: &str,
    ) -> Result<Vec<String>, ApiError> {
        let chunks = split_text(text, &self.chunker);
        if chunks.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Internal(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let items: Vec<(String, Vec<f32>, String, Option<Value>)> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, embedding))| {
                let mut meta = metadata
                    .as_ref()
                    .and_then(|value| value.as_object().cloned())
                    .unwrap_or_default();
                meta.insert("chunk_index".to_string(), json!(index));
                (
                    Uuid::new_v4().to_string(),
                    embedding,
                    chunk,
                    Some(Value::Object(meta)),
                )
            })
            .collect();

        let ids: Vec<String> = items.iter().map(|(id, ..)| id.clone()).collect();
        self.store.add_batch(collection, items).await?;

        tracing::info!("ingested {} chunk(s) into {}", ids.len(), collection);
        Ok(ids)
    }
}
