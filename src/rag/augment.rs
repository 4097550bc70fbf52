//! RAG decorator over the chat model.
//!
//! Wraps an inner `ChatModel` and conditionally rewrites the most recent
//! user turn with retrieved context before delegating. Retrieval failure
//! never blocks the chat: the original message is used instead.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::mpsc;

use super::prompt::build_prompt;
use super::retriever::Retriever;
use crate::llm::{ChatMessage, ChatModel, Role, StreamChunk};

#[derive(Debug, Clone)]
pub struct RagOptions {
    pub enabled: bool,
    /// Minimum message length before retrieval is attempted; 0 means
    /// always retrieve.
    pub threshold: usize,
    pub top_k: usize,
    pub collection: String,
}

/// True iff RAG is enabled and the message clears the length threshold.
pub fn should_use_rag(options: &RagOptions, message: &str) -> bool {
    if !options.enabled {
        return false;
    }
    if options.threshold > 0 {
        return message.chars().count() >= options.threshold;
    }
    true
}

pub struct RagChatModel {
    inner: Arc<dyn ChatModel>,
    retriever: Arc<Retriever>,
    options: RagOptions,
}

impl RagChatModel {
    pub fn new(inner: Arc<dyn ChatModel>, retriever: Arc<Retriever>, options: RagOptions) -> Self {
        Self {
            inner,
            retriever,
            options,
        }
    }

    /// Rewrite the last turn with retrieved context when it is a user turn
    /// that qualifies; earlier turns are never touched.
    async fn augment(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut history = history.to_vec();

        let Some(last) = history.last_mut() else {
            return history;
        };
        if last.role != Role::User || !should_use_rag(&self.options, &last.content) {
            return history;
        }

        match self
            .retriever
            .search(&last.content, self.options.top_k, &self.options.collection)
            .await
        {
            Ok(docs) if docs.is_empty() => {
                tracing::debug!("no documents retrieved, using original message");
            }
            Ok(docs) => {
                tracing::debug!("augmenting message with {} document(s)", docs.len());
                last.content = build_prompt(&last.content, &docs);
            }
            Err(err) => {
                tracing::warn!("retrieval failed, proceeding without context: {}", err);
            }
        }

        history
    }
}

#[async_trait]
impl ChatModel for RagChatModel {
    async fn stream_chat(&self, history: &[ChatMessage]) -> mpsc::Receiver<StreamChunk> {
        let history = self.augment(history).await;
        self.inner.stream_chat(&history).await
    }

    async fn sse_response(&self, history: &[ChatMessage]) -> mpsc::Receiver<Bytes> {
        let history = self.augment(history).await;
        self.inner.sse_response(&history).await
    }
}
