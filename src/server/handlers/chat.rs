use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use axum::Json;
use futures_util::stream;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatModel};
use crate::rag::RagChatModel;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<ChatMessage>,
}

/// `POST /api/chat` — stream a model response as Server-Sent Events.
///
/// The RAG decorator is constructed per request; its byte stream is relayed
/// verbatim as the response body.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if body.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let model = RagChatModel::new(
        state.chat.clone(),
        state.retriever.clone(),
        state.rag_options(),
    );
    let rx = model.sse_response(&body.messages).await;

    let body_stream = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|bytes| (Ok::<_, Infallible>(bytes), rx))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(body_stream))
        .map_err(ApiError::internal)
}
