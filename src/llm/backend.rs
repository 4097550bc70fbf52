//! Low-level chat-completion backend over an OpenAI-compatible API.
//!
//! `CompletionBackend` is the seam the chat service is built on: one
//! non-streaming call that returns the raw assistant message (tool calls
//! included) and one streaming call that yields text/reasoning deltas.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::errors::ApiError;

/// One parsed delta from the upstream token stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Single non-streaming completion. Returns the raw assistant message
    /// object from the response, `tool_calls` and all.
    async fn complete(&self, messages: &[Value], tools: Option<&Value>)
        -> Result<Value, ApiError>;

    /// Streaming completion. Transport failures after the stream opens are
    /// delivered through the channel; malformed payload lines are skipped.
    async fn stream(
        &self,
        messages: &[Value],
    ) -> Result<mpsc::Receiver<Result<StreamDelta, ApiError>>, ApiError>;
}

#[derive(Clone)]
pub struct OpenAiCompatBackend {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatBackend {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    async fn complete(
        &self,
        messages: &[Value],
        tools: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        if let (Some(obj), Some(tools)) = (body.as_object_mut(), tools) {
            if tools.as_array().is_some_and(|list| !list.is_empty()) {
                obj.insert("tools".to_string(), tools.clone());
            }
        }

        let res = self.request(&body).send().await.map_err(ApiError::internal)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let message = payload["choices"][0]["message"].clone();
        if message.is_null() {
            return Err(ApiError::Internal(
                "chat completion response carried no message".to_string(),
            ));
        }
        Ok(message)
    }

    async fn stream(
        &self,
        messages: &[Value],
    ) -> Result<mpsc::Receiver<Result<StreamDelta, ApiError>>, ApiError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let res = self.request(&body).send().await.map_err(ApiError::internal)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "chat stream failed ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            // Upstream byte chunks can split SSE lines; buffer until newline.
            let mut buffer = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);
                            if line.is_empty() {
                                continue;
                            }
                            if line == "data: [DONE]" {
                                return;
                            }
                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            let Ok(payload) = serde_json::from_str::<Value>(data) else {
                                tracing::debug!("skipping malformed stream line");
                                continue;
                            };
                            let delta = parse_delta(&payload);
                            if delta == StreamDelta::default() {
                                continue;
                            }
                            if tx.send(Ok(delta)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(ApiError::internal(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

fn parse_delta(payload: &Value) -> StreamDelta {
    let delta = &payload["choices"][0]["delta"];
    StreamDelta {
        content: delta["content"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        reasoning: delta["reasoning_content"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map(str::to_string),
    }
}
