use axum::extract::State;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::error::Result;
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{CreateUserRequest, User, UserRole};
use crate::response::ApiResponse;
use crate::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let user = state.store.create_user(req).await?;
    Ok(Json(ApiResponse::success("User created", user)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr, UserRole::Manager])?;

    let users = state.store.list_users().await?;
    Ok(Json(ApiResponse::success("Users retrieved", users)))
}
