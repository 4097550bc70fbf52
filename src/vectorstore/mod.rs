//! Vector store abstraction and the Chroma backend.

mod chroma;

pub use chroma::ChromaStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// A record as stored: id, document text and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub metadata: Option<Value>,
}

/// One similarity-search hit, in retrieval-rank order (lower distance =
/// more similar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: Option<Value>,
    pub distance: f32,
}

/// Abstract interface over a similarity-search database. Records are only
/// inserted and deleted, never updated.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records: (id, embedding, document, metadata).
    async fn add_batch(
        &self,
        collection: &str,
        items: Vec<(String, Vec<f32>, String, Option<Value>)>,
    ) -> Result<(), ApiError>;

    /// Nearest-neighbor query returning at most `k` hits with documents,
    /// metadata and distances.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ApiError>;

    /// List all stored records in the collection.
    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, ApiError>;

    /// Delete one record by id.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), ApiError>;

    /// Total record count in the collection.
    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}
