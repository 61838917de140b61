use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{CreateCycleRequest, Cycle, CycleStatus, UpdateCycleRequest, UserRole};
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateCycleRequest>,
) -> Result<Json<ApiResponse<Cycle>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let cycle = state.store.create_cycle(req).await?;
    Ok(Json(ApiResponse::success("Cycle created", cycle)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Cycle>>>> {
    authenticate(&state.store, &headers).await?;

    // Reject bad filter values with the envelope, not an extractor error.
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<CycleStatus>().map_err(AppError::Validation))
        .transpose()?;

    let cycles = state.store.list_cycles(status).await?;
    Ok(Json(ApiResponse::success("Cycles retrieved", cycles)))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Cycle>>> {
    authenticate(&state.store, &headers).await?;

    let cycle = state.store.get_cycle(id).await?;
    Ok(Json(ApiResponse::success("Cycle retrieved", cycle)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCycleRequest>,
) -> Result<Json<ApiResponse<Cycle>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let cycle = state
        .store
        .update_cycle(id, req, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::success("Cycle updated", cycle)))
}
