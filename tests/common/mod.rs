#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use ragchat_backend::core::errors::ApiError;
use ragchat_backend::embedding::EmbeddingProvider;
use ragchat_backend::llm::{CompletionBackend, StreamDelta};
use ragchat_backend::vectorstore::{SearchHit, StoredRecord, VectorStore};

/// Scripted completion backend capturing every request it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    /// Assistant message returned by `complete`, or an error message.
    pub completion: Option<Result<Value, String>>,
    /// Deltas replayed by each `stream` call.
    pub stream_script: Vec<Result<StreamDelta, String>>,
    /// When set, `stream` fails before the stream opens.
    pub fail_stream_open: Option<String>,
    pub complete_calls: Mutex<Vec<Vec<Value>>>,
    pub stream_calls: Mutex<Vec<Vec<Value>>>,
}

impl ScriptedBackend {
    pub fn with_completion(message: Value) -> Self {
        Self {
            completion: Some(Ok(message)),
            ..Self::default()
        }
    }

    pub fn streaming(mut self, deltas: Vec<StreamDelta>) -> Self {
        self.stream_script = deltas.into_iter().map(Ok).collect();
        self
    }
}

pub fn content_delta(text: &str) -> StreamDelta {
    StreamDelta {
        content: Some(text.to_string()),
        reasoning: None,
    }
}

pub fn reasoning_delta(text: &str) -> StreamDelta {
    StreamDelta {
        content: None,
        reasoning: Some(text.to_string()),
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        messages: &[Value],
        _tools: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.complete_calls.lock().unwrap().push(messages.to_vec());
        match &self.completion {
            Some(Ok(message)) => Ok(message.clone()),
            Some(Err(err)) => Err(ApiError::Internal(err.clone())),
            None => Ok(serde_json::json!({"role": "assistant", "content": ""})),
        }
    }

    async fn stream(
        &self,
        messages: &[Value],
    ) -> Result<mpsc::Receiver<Result<StreamDelta, ApiError>>, ApiError> {
        self.stream_calls.lock().unwrap().push(messages.to_vec());
        if let Some(err) = &self.fail_stream_open {
            return Err(ApiError::Internal(err.clone()));
        }

        let (tx, rx) = mpsc::channel(32);
        let script = self.stream_script.clone();
        tokio::spawn(async move {
            for item in script {
                let is_err = item.is_err();
                if tx.send(item.map_err(ApiError::Internal)).await.is_err() {
                    return;
                }
                if is_err {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// Deterministic embedding from byte content; same text, same vector.
#[derive(Debug)]
pub struct MockEmbedder;

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 8];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % 8] += f32::from(byte) / 255.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        Ok(embed_text(text))
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|text| embed_text(text)).collect())
    }
}

/// Embedder recording how often it is invoked.
#[derive(Default, Debug)]
pub struct CountingEmbedder {
    pub calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(embed_text(text))
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(inputs.iter().map(|text| embed_text(text)).collect())
    }
}

/// Embedder that always fails, for degraded-path tests.
#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
        Err(ApiError::ServiceUnavailable("embedding backend down".to_string()))
    }

    async fn embed_batch(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Err(ApiError::ServiceUnavailable("embedding backend down".to_string()))
    }
}

#[derive(Clone)]
struct Record {
    id: String,
    embedding: Vec<f32>,
    document: String,
    metadata: Option<Value>,
}

/// In-memory vector store with exact cosine-distance search.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add_batch(
        &self,
        collection: &str,
        items: Vec<(String, Vec<f32>, String, Option<Value>)>,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.lock().unwrap();
        let records = collections.entry(collection.to_string()).or_default();
        for (id, embedding, document, metadata) in items {
            records.push(Record {
                id,
                embedding,
                document,
                metadata,
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let collections = self.collections.lock().unwrap();
        let mut hits: Vec<SearchHit> = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|record| SearchHit {
                        id: record.id.clone(),
                        document: record.document.clone(),
                        metadata: record.metadata.clone(),
                        distance: cosine_distance(embedding, &record.embedding),
                    })
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, ApiError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|record| StoredRecord {
                        id: record.id.clone(),
                        document: record.document.clone(),
                        metadata: record.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ApiError> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(records) = collections.get_mut(collection) {
            records.retain(|record| record.id != id);
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).map(Vec::len).unwrap_or(0))
    }
}
