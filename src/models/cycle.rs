//! Award cycles and their lifecycle
//!
//! A cycle is a time-boxed award period. Its status moves forward only:
//! DRAFT/ACTIVE -> OPEN -> CLOSED -> FINALIZED. ACTIVE is a legacy alias
//! for the pre-window state and gates like DRAFT.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Draft,
    /// Legacy alias retained for backward compatibility; behaves like
    /// Draft for gating and is what the auto-open sweep promotes.
    Active,
    Open,
    Closed,
    Finalized,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Draft => "DRAFT",
            CycleStatus::Active => "ACTIVE",
            CycleStatus::Open => "OPEN",
            CycleStatus::Closed => "CLOSED",
            CycleStatus::Finalized => "FINALIZED",
        }
    }

    /// Position in the forward-only lifecycle. Draft and Active share a
    /// rank so a legacy ACTIVE cycle can be marked OPEN but never back.
    fn rank(&self) -> u8 {
        match self {
            CycleStatus::Draft | CycleStatus::Active => 0,
            CycleStatus::Open => 1,
            CycleStatus::Closed => 2,
            CycleStatus::Finalized => 3,
        }
    }

    /// Transitions only ever move the cycle forward.
    pub fn can_transition_to(&self, target: CycleStatus) -> bool {
        target.rank() >= self.rank()
    }

    /// True before the nomination window has opened.
    pub fn is_pre_open(&self) -> bool {
        matches!(self, CycleStatus::Draft | CycleStatus::Active)
    }

    /// The awarding window: HR may record awards while the cycle is OPEN,
    /// CLOSED, or FINALIZED, never in DRAFT/ACTIVE. Single policy point;
    /// every award-creation call site goes through here.
    pub fn in_awarding_window(&self) -> bool {
        matches!(
            self,
            CycleStatus::Open | CycleStatus::Closed | CycleStatus::Finalized
        )
    }
}

impl std::str::FromStr for CycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(CycleStatus::Draft),
            "ACTIVE" => Ok(CycleStatus::Active),
            "OPEN" => Ok(CycleStatus::Open),
            "CLOSED" => Ok(CycleStatus::Closed),
            "FINALIZED" => Ok(CycleStatus::Finalized),
            _ => Err(format!("Invalid cycle status: {}", s)),
        }
    }
}

/// A time-boxed award period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display label, e.g. "Q1 2026"
    pub quarter: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_type_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a cycle
#[derive(Debug, Deserialize)]
pub struct CreateCycleRequest {
    pub name: String,
    pub description: Option<String>,
    pub quarter: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<CycleStatus>,
    pub award_type_id: Option<Uuid>,
}

/// Partial update for a cycle. Setting `status` to CLOSED before the end
/// date requires `drop_cycle` to choose between an ordinary early close
/// (false/absent) and the destructive cascade (true).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCycleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CycleStatus>,
    #[serde(default)]
    pub drop_cycle: bool,
}
