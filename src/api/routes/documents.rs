//! Document Routes
//!
//! Every write also maintains the table's secondary indexes.
//!
//! - POST /api/v1/databases/:db/tables/:table/documents - Insert a document
//! - GET /api/v1/databases/:db/tables/:table/documents/:id - Fetch a document
//! - PUT /api/v1/databases/:db/tables/:table/documents/:id - Replace a document
//! - DELETE /api/v1/databases/:db/tables/:table/documents/:id - Delete a document

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::DocumentResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// POST /api/v1/databases/:db/tables/:table/documents
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Path((db, table)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let doc = state.service.create_document(&db, &table, payload).await?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// GET /api/v1/databases/:db/tables/:table/documents/:id
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path((db, table, id)): Path<(String, String, Uuid)>,
) -> ApiResult<Json<DocumentResponse>> {
    let doc = state.service.get_document(&db, &table, id).await?;
    Ok(Json(doc.into()))
}

/// PUT /api/v1/databases/:db/tables/:table/documents/:id
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path((db, table, id)): Path<(String, String, Uuid)>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<DocumentResponse>> {
    let doc = state.service.update_document(&db, &table, id, payload).await?;
    Ok(Json(doc.into()))
}

/// DELETE /api/v1/databases/:db/tables/:table/documents/:id
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((db, table, id)): Path<(String, String, Uuid)>,
) -> ApiResult<StatusCode> {
    state.service.delete_document(&db, &table, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
