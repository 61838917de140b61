//! Nominations
//!
//! A nomination proposes one employee for recognition within a cycle.
//! Status progression: SUBMITTED -> PANEL_REVIEW -> HR_REVIEW -> FINALIZED.
//! At most one non-terminal nomination may exist per (cycle, nominee).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NominationStatus {
    /// Present in one schema variant; never produced by submit()
    Draft,
    Submitted,
    PanelReview,
    HrReview,
    Finalized,
}

impl NominationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NominationStatus::Draft => "DRAFT",
            NominationStatus::Submitted => "SUBMITTED",
            NominationStatus::PanelReview => "PANEL_REVIEW",
            NominationStatus::HrReview => "HR_REVIEW",
            NominationStatus::Finalized => "FINALIZED",
        }
    }

    /// Non-terminal statuses count against the one-per-(cycle, nominee)
    /// uniqueness rule.
    pub fn is_non_terminal(&self) -> bool {
        matches!(
            self,
            NominationStatus::Submitted
                | NominationStatus::PanelReview
                | NominationStatus::HrReview
        )
    }
}

impl std::str::FromStr for NominationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(NominationStatus::Draft),
            "SUBMITTED" => Ok(NominationStatus::Submitted),
            "PANEL_REVIEW" => Ok(NominationStatus::PanelReview),
            "HR_REVIEW" => Ok(NominationStatus::HrReview),
            "FINALIZED" => Ok(NominationStatus::Finalized),
            _ => Err(format!("Invalid nomination status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nomination {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub form_id: Uuid,
    pub nominee_id: Uuid,
    pub nominated_by_id: Uuid,
    pub status: NominationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One answer supplied at submission time
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    pub field_key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateNominationRequest {
    pub cycle_id: Uuid,
    pub form_id: Uuid,
    pub nominee_id: Uuid,
    pub answers: Vec<AnswerInput>,
}
