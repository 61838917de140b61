//! User operations
//!
//! Enough user surface for the workflow: nominees and callers must resolve
//! to active rows, and panel membership backs the reviewer capability.
//! Credentials and profile data live elsewhere.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{CreateUserRequest, User, UserRole};

use super::{is_unique_violation, Store};

impl Store {
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, employee_code, name, email, role, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.employee_code)
        .bind(&req.name)
        .bind(&req.email)
        .bind(req.role.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User with this email already exists".to_string())
            } else {
                e.into()
            }
        })?;

        Ok(User {
            id,
            employee_code: req.employee_code,
            name: req.name,
            email: req.email,
            role: req.role,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, employee_code, name, email, role, is_active, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        row.try_into()
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, employee_code, name, email, role, is_active, created_at
            FROM users
            WHERE is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Create the bootstrap HR account unless the email is already taken.
    pub async fn ensure_admin(&self, email: &str, name: &str) -> Result<()> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        if exists > 0 {
            return Ok(());
        }

        let user = self
            .create_user(CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                role: UserRole::Hr,
                employee_code: None,
            })
            .await?;
        tracing::info!(user_id = %user.id, "Bootstrap HR account created");
        Ok(())
    }

    /// Panel-member capability: membership in at least one panel.
    pub async fn is_panel_member(&self, user_id: Uuid) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM panel_members WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    employee_code: Option<String>,
    name: String,
    email: String,
    role: String,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            employee_code: row.employee_code,
            name: row.name,
            email: row.email,
            role: row
                .role
                .parse::<UserRole>()
                .map_err(AppError::Validation)?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Validation(format!("Invalid UUID: {}", e)))
}
