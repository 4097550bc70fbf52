use serde::{Deserialize, Serialize};

/// Terminal frame of every successful SSE response body.
pub const SSE_DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One incremental unit of a model response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamChunk {
    Content { content: String },
    Thinking { content: String },
    Error { error: String },
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        StreamChunk::Content {
            content: text.into(),
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        StreamChunk::Thinking {
            content: text.into(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        StreamChunk::Error {
            error: message.to_string(),
        }
    }

    /// Encode as a single `data: {json}\n\n` SSE frame.
    pub fn sse_frame(&self) -> String {
        format!(
            "data: {}\n\n",
            serde_json::to_string(self).unwrap_or_default()
        )
    }
}
