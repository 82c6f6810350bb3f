//! Database and Table Routes
//!
//! - GET /api/v1/databases - List databases
//! - POST /api/v1/databases - Create a database
//! - DELETE /api/v1/databases/:db - Drop a database with its tables
//! - GET /api/v1/databases/:db/tables - List tables
//! - POST /api/v1/databases/:db/tables - Create a table
//! - DELETE /api/v1/databases/:db/tables/:table - Drop a table and its indexes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateNamedRequest, DatabaseListResponse, TableListResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::catalog::{DatabaseInfo, TableInfo};

/// GET /api/v1/databases
pub async fn list_databases(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DatabaseListResponse>> {
    let databases = state.service.list_databases().await;
    Ok(Json(DatabaseListResponse {
        total: databases.len(),
        databases,
    }))
}

/// POST /api/v1/databases
pub async fn create_database(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamedRequest>,
) -> ApiResult<(StatusCode, Json<DatabaseInfo>)> {
    let info = state.service.create_database(&req.name).await?;
    tracing::info!(database = %info.name, "Database created");
    Ok((StatusCode::CREATED, Json(info)))
}

/// DELETE /api/v1/databases/:db
pub async fn delete_database(
    State(state): State<Arc<AppState>>,
    Path(db): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_database(&db).await?;
    tracing::info!(database = %db, "Database deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/databases/:db/tables
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Path(db): Path<String>,
) -> ApiResult<Json<TableListResponse>> {
    let tables = state.service.list_tables(&db).await?;
    Ok(Json(TableListResponse {
        database: db,
        total: tables.len(),
        tables,
    }))
}

/// POST /api/v1/databases/:db/tables
pub async fn create_table(
    State(state): State<Arc<AppState>>,
    Path(db): Path<String>,
    Json(req): Json<CreateNamedRequest>,
) -> ApiResult<(StatusCode, Json<TableInfo>)> {
    let info = state.service.create_table(&db, &req.name).await?;
    tracing::info!(database = %db, table = %info.name, "Table created");
    Ok((StatusCode::CREATED, Json(info)))
}

/// DELETE /api/v1/databases/:db/tables/:table
pub async fn delete_table(
    State(state): State<Arc<AppState>>,
    Path((db, table)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.service.delete_table(&db, &table).await?;
    tracing::info!(database = %db, table = %table, "Table deleted");
    Ok(StatusCode::NO_CONTENT)
}
