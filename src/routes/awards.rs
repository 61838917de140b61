use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{
    Award, AwardType, CreateAwardRequest, CreateAwardTypeRequest, Cycle, UpdateAwardRequest,
    UserRole,
};
use crate::response::ApiResponse;
use crate::store::{NominationSummary, ScoredNomination};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub cycle_id: Option<Uuid>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAwardRequest>,
) -> Result<Json<ApiResponse<Award>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let award = state.store.create_award(req).await?;
    Ok(Json(ApiResponse::success("Award created", award)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Award>>>> {
    authenticate(&state.store, &headers).await?;

    let awards = state.store.list_awards(query.cycle_id).await?;
    Ok(Json(ApiResponse::success("Awards retrieved", awards)))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Award>>> {
    authenticate(&state.store, &headers).await?;

    let award = state.store.get_award(id).await?;
    Ok(Json(ApiResponse::success("Award retrieved", award)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAwardRequest>,
) -> Result<Json<ApiResponse<Award>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let award = state.store.update_award(id, req).await?;
    Ok(Json(ApiResponse::success("Award updated", award)))
}

pub async fn finalize_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Cycle>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let cycle = state.store.finalize_cycle(id).await?;
    Ok(Json(ApiResponse::success("Cycle finalized", cycle)))
}

pub async fn results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ScoredNomination>>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let results = state.store.nominations_with_scores(id).await?;
    Ok(Json(ApiResponse::success("Results retrieved", results)))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<NominationSummary>>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let summary = state.store.hr_summary(id).await?;
    Ok(Json(ApiResponse::success("Summary retrieved", summary)))
}

pub async fn create_type(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAwardTypeRequest>,
) -> Result<Json<ApiResponse<AwardType>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let award_type = state.store.create_award_type(req).await?;
    Ok(Json(ApiResponse::success("Award type created", award_type)))
}

pub async fn list_types(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AwardType>>>> {
    authenticate(&state.store, &headers).await?;

    let types = state.store.list_award_types().await?;
    Ok(Json(ApiResponse::success("Award types retrieved", types)))
}
