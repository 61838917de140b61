//! Awards and award types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The finalized recognition record for a winning nomination. The winner
/// must be the nomination's nominee, and at most one active award may
/// reference a nomination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Award {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub nomination_id: Uuid,
    pub winner_id: Uuid,
    /// e.g. "Employee of the Quarter"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_type: Option<String>,
    /// 1st, 2nd, 3rd place
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
    /// HR's announcement comment for the winner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named award label catalog, optionally referenced by cycles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardType {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAwardRequest {
    pub cycle_id: Uuid,
    pub nomination_id: Uuid,
    pub winner_id: Uuid,
    pub award_type: Option<String>,
    pub rank: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAwardTypeRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Partial patch; permitted only while the cycle is FINALIZED.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAwardRequest {
    pub award_type: Option<String>,
    pub rank: Option<i64>,
    pub comment: Option<String>,
}
