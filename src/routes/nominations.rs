use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{CreateNominationRequest, Nomination, NominationStatus, UserRole};
use crate::response::ApiResponse;
use crate::store::NominationDetail;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub cycle_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: NominationStatus,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateNominationRequest>,
) -> Result<Json<ApiResponse<Nomination>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Manager, UserRole::Hr])?;

    let nomination = state
        .store
        .submit_nomination(identity.user_id, req, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::success(
        "Nomination submitted",
        nomination,
    )))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Nomination>>>> {
    let identity = authenticate(&state.store, &headers).await?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<NominationStatus>().map_err(AppError::Validation))
        .transpose()?;

    let nominations = state
        .store
        .list_nominations(identity, query.cycle_id, status)
        .await?;
    Ok(Json(ApiResponse::success(
        "Nominations retrieved",
        nominations,
    )))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NominationDetail>>> {
    authenticate(&state.store, &headers).await?;

    let detail = state.store.get_nomination(id).await?;
    Ok(Json(ApiResponse::success("Nomination retrieved", detail)))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Nomination>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let nomination = state.store.update_nomination_status(id, req.status).await?;
    Ok(Json(ApiResponse::success(
        "Nomination status updated",
        nomination,
    )))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    state.store.delete_nomination(id).await?;
    Ok(Json(ApiResponse::success(
        "Nomination deleted",
        serde_json::Value::Null,
    )))
}

pub async fn delete_for_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(cycle_id): Path<Uuid>,
) -> Result<Json<ApiResponse>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let deleted = state.store.delete_nominations_for_cycle(cycle_id).await?;
    Ok(Json(ApiResponse::success(
        "Cycle nominations deleted",
        serde_json::json!({ "deleted": deleted }),
    )))
}
