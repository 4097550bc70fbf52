//! Chat service over a completion backend.
//!
//! `ChatModelClient` prepends the configured system instruction, maps the
//! abstract history to the backend's native message format and implements
//! the tool-calling round trip at the SSE boundary.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::llm::backend::CompletionBackend;
use crate::llm::types::{ChatMessage, StreamChunk, SSE_DONE_FRAME};
use crate::tools::ToolRegistry;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stream a response as typed chunks. Any failure produces exactly one
    /// `error` chunk before the channel closes; this mode has no done marker.
    async fn stream_chat(&self, history: &[ChatMessage]) -> mpsc::Receiver<StreamChunk>;

    /// SSE-framed response body for the HTTP boundary. Terminates with the
    /// `[DONE]` sentinel on success; on error exactly one `error` frame is
    /// emitted and the stream closes without the sentinel.
    async fn sse_response(&self, history: &[ChatMessage]) -> mpsc::Receiver<Bytes>;
}

pub struct ChatModelClient {
    backend: Arc<dyn CompletionBackend>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
}

impl ChatModelClient {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        tools: Arc<ToolRegistry>,
        system_prompt: String,
    ) -> Self {
        Self {
            backend,
            tools,
            system_prompt,
        }
    }

    /// System instruction first, then the history in original order.
    fn to_native(&self, history: &[ChatMessage]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(json!({
            "role": "system",
            "content": self.system_prompt,
        }));
        for message in history {
            messages.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }
        messages
    }
}

#[async_trait]
impl ChatModel for ChatModelClient {
    async fn stream_chat(&self, history: &[ChatMessage]) -> mpsc::Receiver<StreamChunk> {
        let (tx, rx) = mpsc::channel(32);
        let backend = self.backend.clone();
        let messages = self.to_native(history);

        tokio::spawn(async move {
            let mut deltas = match backend.stream(&messages).await {
                Ok(deltas) => deltas,
                Err(err) => {
                    let _ = tx.send(StreamChunk::error(err)).await;
                    return;
                }
            };

            while let Some(item) = deltas.recv().await {
                match item {
                    Ok(delta) => {
                        if let Some(content) = delta.content {
                            if tx.send(StreamChunk::content(content)).await.is_err() {
                                return;
                            }
                        }
                        if let Some(reasoning) = delta.reasoning {
                            if tx.send(StreamChunk::thinking(reasoning)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(StreamChunk::error(err)).await;
                        return;
                    }
                }
            }
        });

        rx
    }

    async fn sse_response(&self, history: &[ChatMessage]) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(32);
        let backend = self.backend.clone();
        let tools = self.tools.clone();
        let messages = self.to_native(history);

        tokio::spawn(async move {
            if let Err(err) = run_sse_exchange(backend, tools, messages, &tx).await {
                let frame = StreamChunk::error(err).sse_frame();
                let _ = tx.send(Bytes::from(frame)).await;
            }
        });

        rx
    }
}

/// The two-phase exchange behind one SSE response. Returns `Err` only for
/// failures that must surface as an error frame (without the sentinel).
async fn run_sse_exchange(
    backend: Arc<dyn CompletionBackend>,
    tools: Arc<ToolRegistry>,
    mut messages: Vec<Value>,
    tx: &mpsc::Sender<Bytes>,
) -> Result<(), ApiError> {
    let definitions = tools.definitions();
    let declared = if tools.is_empty() {
        None
    } else {
        Some(&definitions)
    };

    let assistant = backend.complete(&messages, declared).await?;
    let tool_calls = assistant
        .get("tool_calls")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if !tool_calls.is_empty() {
        tracing::debug!("model requested {} tool call(s)", tool_calls.len());
        messages.push(assistant);
        for call in &tool_calls {
            let name = call["function"]["name"].as_str().unwrap_or_default();
            let Some(tool) = tools.get(name) else {
                tracing::warn!("model requested unknown tool: {}", name);
                continue;
            };
            let args = parse_arguments(call);
            let output = match tool.invoke(&args).await {
                Ok(output) => output,
                Err(err) => format!("Error: {}", err),
            };
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call["id"],
                "content": output,
            }));
        }
    }

    // With tool calls: stream over the extended history. Without: stream
    // the original request. Both forward content and thinking chunks.
    let mut deltas = backend.stream(&messages).await?;
    while let Some(item) = deltas.recv().await {
        let delta = item?;
        if let Some(content) = delta.content {
            let frame = StreamChunk::content(content).sse_frame();
            if tx.send(Bytes::from(frame)).await.is_err() {
                return Ok(());
            }
        }
        if let Some(reasoning) = delta.reasoning {
            let frame = StreamChunk::thinking(reasoning).sse_frame();
            if tx.send(Bytes::from(frame)).await.is_err() {
                return Ok(());
            }
        }
    }

    let _ = tx.send(Bytes::from(SSE_DONE_FRAME)).await;
    Ok(())
}

/// Tool-call arguments arrive as a JSON-encoded string on the wire;
/// unparseable arguments degrade to an empty object.
fn parse_arguments(call: &Value) -> Value {
    match &call["function"]["arguments"] {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
        value @ Value::Object(_) => value.clone(),
        _ => json!({}),
    }
}
