//! Users and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary role of a user. Panel membership is a separate capability
/// tracked through panel_members, not a role value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Hr,
    Manager,
    Employee,
    Panel,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Hr => "HR",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
            UserRole::Panel => "PANEL",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HR" => Ok(UserRole::Hr),
            "MANAGER" => Ok(UserRole::Manager),
            "EMPLOYEE" => Ok(UserRole::Employee),
            "PANEL" => Ok(UserRole::Panel),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_code: Option<String>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to register a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub employee_code: Option<String>,
}
