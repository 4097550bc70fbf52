//! Retrieval pipeline: query embedding -> nearest neighbors -> documents.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::vectorstore::VectorStore;

/// A retrieved passage in retrieval-rank order (descending similarity).
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: Map<String, Value>,
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embed the query and return its `k` nearest documents from the named
    /// collection. Provider and store errors propagate unmodified; there is
    /// no retry and no partial result.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        collection: &str,
    ) -> Result<Vec<RetrievedDocument>, ApiError> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query(collection, &embedding, k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedDocument {
                content: hit.document,
                metadata: hit
                    .metadata
                    .and_then(|value| value.as_object().cloned())
                    .unwrap_or_default(),
            })
            .collect())
    }
}
