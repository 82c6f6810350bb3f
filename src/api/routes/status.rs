//! Index Build Status Routes
//!
//! - GET /api/v1/index-builds - List builds (`?active=true` for running only)
//! - GET /api/v1/index-builds/:id - Progress of one build

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{BuildListQuery, BuildStatusListResponse, BuildStatusResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/index-builds
pub async fn list_builds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BuildListQuery>,
) -> ApiResult<Json<BuildStatusListResponse>> {
    let builds: Vec<BuildStatusResponse> = state
        .service
        .list_build_status(query.active)
        .await
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(BuildStatusListResponse {
        total: builds.len(),
        builds,
    }))
}

/// GET /api/v1/index-builds/:id
pub async fn get_build(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BuildStatusResponse>> {
    let status = state.service.build_status(id).await?;
    Ok(Json(status.into()))
}
