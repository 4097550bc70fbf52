//! Chroma REST backend.
//!
//! Talks to a Chroma server over its v1 HTTP API. Collections are resolved
//! by name with get-or-create on every operation; Chroma addresses them by
//! UUID internally.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{SearchHit, StoredRecord, VectorStore};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ChromaStore {
    base_url: String,
    client: Client,
}

impl ChromaStore {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}/api/v1", host, port),
            client: Client::new(),
        }
    }

    /// Resolve a collection name to its Chroma id, creating it if needed.
    async fn ensure_collection(&self, name: &str) -> Result<String, ApiError> {
        let url = format!("{}/collections", self.base_url);
        let body = json!({
            "name": name,
            "get_or_create": true,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ApiError::ServiceUnavailable(format!("chroma unreachable: {}", err)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "chroma collection error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        payload["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Internal("chroma collection response missing id".to_string()))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| ApiError::ServiceUnavailable(format!("chroma unreachable: {}", err)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "chroma error ({}): {}",
                status, text
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add_batch(
        &self,
        collection: &str,
        items: Vec<(String, Vec<f32>, String, Option<Value>)>,
    ) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let collection_id = self.ensure_collection(collection).await?;

        let mut ids = Vec::with_capacity(items.len());
        let mut embeddings = Vec::with_capacity(items.len());
        let mut documents = Vec::with_capacity(items.len());
        let mut metadatas = Vec::with_capacity(items.len());
        for (id, embedding, document, metadata) in items {
            ids.push(id);
            embeddings.push(embedding);
            documents.push(document);
            metadatas.push(metadata.unwrap_or_else(|| json!({})));
        }

        let count = ids.len();
        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        });
        self.post(&format!("/collections/{}/add", collection_id), &body)
            .await?;

        tracing::debug!("inserted {} record(s) into {}", count, collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let collection_id = self.ensure_collection(collection).await?;

        let body = json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });
        let payload = self
            .post(&format!("/collections/{}/query", collection_id), &body)
            .await?;

        // Positional zip over the first (and only) query's result arrays;
        // missing documents default to empty, missing metadata to null.
        let ids = string_column(&payload["ids"]);
        let documents = &payload["documents"][0];
        let metadatas = &payload["metadatas"][0];
        let distances = &payload["distances"][0];

        let hits = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| SearchHit {
                id,
                document: documents[i].as_str().unwrap_or_default().to_string(),
                metadata: non_null(&metadatas[i]),
                distance: distances[i].as_f64().unwrap_or_default() as f32,
            })
            .collect();

        Ok(hits)
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, ApiError> {
        let collection_id = self.ensure_collection(collection).await?;

        let body = json!({"include": ["documents", "metadatas"]});
        let payload = self
            .post(&format!("/collections/{}/get", collection_id), &body)
            .await?;

        let ids: Vec<String> = payload["ids"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let documents = &payload["documents"];
        let metadatas = &payload["metadatas"];

        let records = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| StoredRecord {
                id,
                document: documents[i].as_str().unwrap_or_default().to_string(),
                metadata: non_null(&metadatas[i]),
            })
            .collect();

        Ok(records)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ApiError> {
        let collection_id = self.ensure_collection(collection).await?;
        let body = json!({"ids": [id]});
        self.post(&format!("/collections/{}/delete", collection_id), &body)
            .await?;
        tracing::debug!("deleted record {} from {}", id, collection);
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let collection_id = self.ensure_collection(collection).await?;
        let url = format!("{}/collections/{}/count", self.base_url, collection_id);

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ApiError::ServiceUnavailable(format!("chroma unreachable: {}", err)))?;

        if !res.status().is_success() {
            return Err(ApiError::Internal(format!(
                "chroma count error: {}",
                res.status()
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        Ok(payload.as_u64().unwrap_or_default() as usize)
    }
}

/// Query responses nest per-query result rows: `ids[0]` is the row for the
/// single query embedding we send.
fn string_column(value: &Value) -> Vec<String> {
    value[0]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn non_null(value: &Value) -> Option<Value> {
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}
