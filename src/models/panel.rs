//! Panels, assignments, and task reviews
//!
//! A panel is a named reviewer group with role-tagged members and an
//! ordered list of scoring tasks. A PanelAssignment binds one panel to one
//! nomination; it completes once a single member has reviewed every
//! required task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelMemberRole {
    Chair,
    Reviewer,
}

impl PanelMemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelMemberRole::Chair => "CHAIR",
            PanelMemberRole::Reviewer => "REVIEWER",
        }
    }
}

impl std::str::FromStr for PanelMemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHAIR" => Ok(PanelMemberRole::Chair),
            "REVIEWER" => Ok(PanelMemberRole::Reviewer),
            _ => Err(format!("Invalid panel member role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelMember {
    pub id: Uuid,
    pub panel_id: Uuid,
    pub user_id: Uuid,
    pub role: PanelMemberRole,
    pub created_at: DateTime<Utc>,
}

/// One scoring criterion on a panel's rubric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelTask {
    pub id: Uuid,
    pub panel_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub max_score: i64,
    pub order_index: i64,
    pub is_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Pending,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "PENDING",
            AssignmentStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AssignmentStatus::Pending),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            _ => Err(format!("Invalid assignment status: {}", s)),
        }
    }
}

/// Binding of one panel to one nomination; unique per pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelAssignment {
    pub id: Uuid,
    pub nomination_id: Uuid,
    pub panel_id: Uuid,
    pub assigned_by: Uuid,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One member's score for one task on one assignment; the
/// (assignment, member, task) triple is unique and resubmission overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelReview {
    pub id: Uuid,
    pub panel_assignment_id: Uuid,
    pub panel_member_id: Uuid,
    pub panel_task_id: Uuid,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePanelRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: PanelMemberRole,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_max_score")]
    pub max_score: i64,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_max_score() -> i64 {
    5
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AssignPanelsRequest {
    pub panel_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub score: i64,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_round_trip() {
        assert_eq!("CHAIR".parse::<PanelMemberRole>().unwrap(), PanelMemberRole::Chair);
        assert_eq!(
            "REVIEWER".parse::<PanelMemberRole>().unwrap(),
            PanelMemberRole::Reviewer
        );
        assert!("MEMBER".parse::<PanelMemberRole>().is_err());
    }

    #[test]
    fn test_assignment_status_round_trip() {
        assert_eq!(
            "PENDING".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Pending
        );
        assert_eq!(
            "COMPLETED".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Completed
        );
        assert!("DONE".parse::<AssignmentStatus>().is_err());
    }

    #[test]
    fn test_task_request_defaults() {
        let req: CreateTaskRequest = serde_json::from_str("{\"title\":\"Impact\"}").unwrap();
        assert_eq!(req.max_score, 5);
        assert_eq!(req.order_index, 0);
        assert!(req.is_required);
    }
}
