use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    pub metadata: Option<Value>,
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CollectionQuery {
    pub collection: Option<String>,
}

fn collection_name(state: &AppState, requested: Option<String>) -> String {
    requested.unwrap_or_else(|| state.config.collection.clone())
}

/// `POST /api/documents` — chunk, embed and store a document.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let collection = collection_name(&state, body.collection);
    let ids = state
        .ingestor
        .ingest(&body.text, body.metadata, &collection)
        .await?;

    Ok(Json(json!({
        "collection": collection,
        "ids": ids,
        "chunks": ids.len(),
    })))
}

/// `GET /api/documents` — list stored records.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_name(&state, query.collection);
    let records = state.store.list(&collection).await?;
    Ok(Json(json!({
        "collection": collection,
        "documents": records,
    })))
}

/// `GET /api/documents/count` — record count.
pub async fn count(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_name(&state, query.collection);
    let count = state.store.count(&collection).await?;
    Ok(Json(json!({
        "collection": collection,
        "count": count,
    })))
}

/// `DELETE /api/documents/:id` — remove one record.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_name(&state, query.collection);
    state.store.delete(&collection, &id).await?;
    Ok(Json(json!({"deleted": id})))
}
