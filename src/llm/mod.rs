pub mod backend;
pub mod chat_model;
pub mod types;

pub use backend::{CompletionBackend, OpenAiCompatBackend, StreamDelta};
pub use chat_model::{ChatModel, ChatModelClient};
pub use types::{ChatMessage, Role, StreamChunk, SSE_DONE_FRAME};
