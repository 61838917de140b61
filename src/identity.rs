//! Caller identity and role checks
//!
//! Token verification lives outside this service; requests arrive with the
//! authenticated subject id in the `x-user-id` header. We resolve the user
//! row, reject inactive accounts, and attach the panel-member capability
//! (membership in at least one panel), which is orthogonal to the primary
//! role.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::UserRole;
use crate::store::Store;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
    /// Member of at least one panel; checked again per-panel when reviewing
    pub panel_member: bool,
}

impl Identity {
    /// Static allow-set check against the caller's primary role.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Insufficient permissions".to_string(),
            ))
        }
    }
}

/// Resolve the caller from request headers.
pub async fn authenticate(store: &Store, headers: &HeaderMap) -> Result<Identity> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Missing credentials".to_string()))?;

    let user_id = Uuid::parse_str(raw)
        .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

    let user = store
        .get_user(user_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::Unauthenticated("User not found".to_string()),
            other => other,
        })?;

    if !user.is_active {
        return Err(AppError::Authorization(
            "User account is inactive".to_string(),
        ));
    }

    let panel_member = store.is_panel_member(user_id).await?;

    Ok(Identity {
        user_id,
        role: user.role,
        panel_member,
    })
}
