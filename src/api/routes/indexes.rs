//! Index Routes
//!
//! - GET /api/v1/databases/:db/tables/:table/indexes - List indexes
//! - POST /api/v1/databases/:db/tables/:table/indexes - Create an index and start its build
//! - GET /api/v1/databases/:db/tables/:table/indexes/:name - Get an index
//! - DELETE /api/v1/databases/:db/tables/:table/indexes/:name - Drop an index
//! - POST /api/v1/databases/:db/tables/:table/indexes/:name/find - Equality lookup

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CreateIndexResponse, DocumentResponse, FindRequest, FindResponse, IndexListResponse,
    IndexResponse,
};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::service::CreateIndexRequest;

/// GET /api/v1/databases/:db/tables/:table/indexes
pub async fn list_indexes(
    State(state): State<Arc<AppState>>,
    Path((db, table)): Path<(String, String)>,
) -> ApiResult<Json<IndexListResponse>> {
    let indexes: Vec<IndexResponse> = state
        .service
        .list_indexes(&db, &table)
        .await?
        .into_iter()
        .map(IndexResponse::from)
        .collect();

    Ok(Json(IndexListResponse {
        total: indexes.len(),
        indexes,
    }))
}

/// POST /api/v1/databases/:db/tables/:table/indexes
///
/// Returns 201 as soon as the index is registered. The index stays
/// inactive until its bulk build completes; poll `status_url` for progress.
pub async fn create_index(
    State(state): State<Arc<AppState>>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<CreateIndexRequest>,
) -> ApiResult<(StatusCode, Json<CreateIndexResponse>)> {
    let created = state.service.create_index(&db, &table, req).await?;

    tracing::info!(
        database = %db,
        table = %table,
        index = %created.index.name,
        status_id = %created.status_id,
        "Index created, build started"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateIndexResponse {
            status_url: format!("/api/v1/index-builds/{}", created.status_id),
            status_id: created.status_id,
            index: created.index.into(),
        }),
    ))
}

/// GET /api/v1/databases/:db/tables/:table/indexes/:name
pub async fn get_index(
    State(state): State<Arc<AppState>>,
    Path((db, table, name)): Path<(String, String, String)>,
) -> ApiResult<Json<IndexResponse>> {
    let index = state.service.get_index(&db, &table, &name).await?;
    Ok(Json(index.into()))
}

/// DELETE /api/v1/databases/:db/tables/:table/indexes/:name
pub async fn delete_index(
    State(state): State<Arc<AppState>>,
    Path((db, table, name)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    state.service.delete_index(&db, &table, &name).await?;
    tracing::info!(database = %db, table = %table, index = %name, "Index deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/databases/:db/tables/:table/indexes/:name/find
///
/// Documents whose first indexed field equals `value`.
pub async fn find_documents(
    State(state): State<Arc<AppState>>,
    Path((db, table, name)): Path<(String, String, String)>,
    Json(req): Json<FindRequest>,
) -> ApiResult<Json<FindResponse>> {
    let documents: Vec<DocumentResponse> = state
        .service
        .find_by_index(&db, &table, &name, &req.value)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(FindResponse {
        index: name,
        total: documents.len(),
        documents,
    }))
}
