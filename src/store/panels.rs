//! Panels, panel assignments, and review scoring
//!
//! The review path is the workhorse here: `submit_review` upserts one
//! member's score for one task, then re-derives assignment completion and
//! nomination promotion inside the same transaction. Scoring is idempotent;
//! resubmitting a task overwrites the previous score.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    AssignmentStatus, CreatePanelRequest, CreateTaskRequest, NominationStatus, Panel,
    PanelAssignment, PanelMember, PanelMemberRole, PanelReview, PanelTask,
};

use super::users::parse_uuid;
use super::{is_unique_violation, Store};

/// What changed as a result of one review submission.
#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub review: PanelReview,
    pub assignment_status: AssignmentStatus,
    /// Set when this submission pushed the nomination into HR_REVIEW
    pub nomination_promoted: bool,
}

/// A task paired with the caller's review of it, if any.
#[derive(Debug, Serialize)]
pub struct TaskWithReview {
    pub task: PanelTask,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<PanelReview>,
}

/// One assignment from a panel member's point of view.
#[derive(Debug, Serialize)]
pub struct MyAssignment {
    pub assignment: PanelAssignment,
    pub panel_name: String,
    pub tasks: Vec<TaskWithReview>,
    /// Tasks the caller has reviewed on this assignment
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

/// HR-facing coverage figures for one assignment.
#[derive(Debug, Serialize)]
pub struct AssignmentCoverage {
    pub assignment: PanelAssignment,
    pub panel_name: String,
    pub review_count: i64,
    /// tasks x members: the review count at full participation
    pub expected_reviews: i64,
}

impl Store {
    pub async fn create_panel(&self, req: CreatePanelRequest) -> Result<Panel> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO panels (id, name, description, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(panel_id = %id, "Panel created");

        Ok(Panel {
            id,
            name: req.name,
            description: req.description,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_panel(&self, id: Uuid) -> Result<Panel> {
        let row = sqlx::query_as::<_, PanelRow>(
            "SELECT id, name, description, is_active, created_at FROM panels WHERE id = ? AND is_active = 1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Panel not found".to_string()))?;

        row.try_into()
    }

    pub async fn list_panels(&self) -> Result<Vec<Panel>> {
        let rows = sqlx::query_as::<_, PanelRow>(
            "SELECT id, name, description, is_active, created_at FROM panels WHERE is_active = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn add_panel_member(
        &self,
        panel_id: Uuid,
        user_id: Uuid,
        role: PanelMemberRole,
    ) -> Result<PanelMember> {
        self.get_panel(panel_id).await?;
        self.get_user(user_id).await?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO panel_members (id, panel_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(panel_id.to_string())
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(AppError::Conflict("User already in panel".to_string()));
            }
            return Err(err.into());
        }

        Ok(PanelMember {
            id,
            panel_id,
            user_id,
            role,
            created_at: now,
        })
    }

    pub async fn list_panel_members(&self, panel_id: Uuid) -> Result<Vec<PanelMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, panel_id, user_id, role, created_at FROM panel_members WHERE panel_id = ? ORDER BY created_at",
        )
        .bind(panel_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn add_panel_task(&self, panel_id: Uuid, req: CreateTaskRequest) -> Result<PanelTask> {
        self.get_panel(panel_id).await?;

        if req.max_score <= 0 {
            return Err(AppError::Validation(
                "max_score must be positive".to_string(),
            ));
        }

        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO panel_tasks
                (id, panel_id, title, description, max_score, order_index, is_required)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(panel_id.to_string())
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.max_score)
        .bind(req.order_index)
        .bind(req.is_required)
        .execute(&self.pool)
        .await?;

        Ok(PanelTask {
            id,
            panel_id,
            title: req.title,
            description: req.description,
            max_score: req.max_score,
            order_index: req.order_index,
            is_required: req.is_required,
        })
    }

    pub async fn list_panel_tasks(&self, panel_id: Uuid) -> Result<Vec<PanelTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, panel_id, title, description, max_score, order_index, is_required
            FROM panel_tasks
            WHERE panel_id = ?
            ORDER BY order_index, title
            "#,
        )
        .bind(panel_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Assign panels to a nomination. Already-assigned panels are skipped;
    /// the call fails only if nothing new would be assigned. The nomination
    /// moves to PANEL_REVIEW in the same transaction.
    pub async fn assign_panels(
        &self,
        nomination_id: Uuid,
        panel_ids: &[Uuid],
        assigned_by: Uuid,
    ) -> Result<Vec<PanelAssignment>> {
        let nomination = self.fetch_nomination(nomination_id).await?;

        if nomination.status == NominationStatus::Finalized {
            return Err(AppError::State(
                "Cannot assign panels to a finalized nomination".to_string(),
            ));
        }

        let mut new_panels = Vec::new();
        for panel_id in panel_ids {
            self.get_panel(*panel_id).await?;
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM panel_assignments WHERE nomination_id = ? AND panel_id = ?",
            )
            .bind(nomination_id.to_string())
            .bind(panel_id.to_string())
            .fetch_one(&self.pool)
            .await?;
            if existing == 0 {
                new_panels.push(*panel_id);
            }
        }

        if new_panels.is_empty() {
            return Err(AppError::Validation(
                "All panels are already assigned to this nomination".to_string(),
            ));
        }

        let now = Utc::now();
        let mut assignments = Vec::with_capacity(new_panels.len());

        let mut tx = self.pool.begin().await?;

        for panel_id in new_panels {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO panel_assignments
                    (id, nomination_id, panel_id, assigned_by, status, assigned_at)
                VALUES (?, ?, ?, ?, 'PENDING', ?)
                "#,
            )
            .bind(id.to_string())
            .bind(nomination_id.to_string())
            .bind(panel_id.to_string())
            .bind(assigned_by.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            assignments.push(PanelAssignment {
                id,
                nomination_id,
                panel_id,
                assigned_by,
                status: AssignmentStatus::Pending,
                assigned_at: now,
                completed_at: None,
            });
        }

        sqlx::query("UPDATE nominations SET status = 'PANEL_REVIEW', updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(nomination_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            nomination_id = %nomination_id,
            assigned = assignments.len(),
            "Panels assigned, nomination moved to PANEL_REVIEW"
        );

        Ok(assignments)
    }

    /// Record one member's score for one task. Resubmission overwrites.
    /// Completion is derived, never set directly: the assignment completes
    /// once this member has scored every required task, and the nomination
    /// promotes to HR_REVIEW once every assignment is complete.
    pub async fn submit_review(
        &self,
        assignment_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
        score: i64,
        comment: Option<String>,
    ) -> Result<ReviewOutcome> {
        let assignment = self.fetch_assignment(assignment_id).await?;

        let member: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM panel_members WHERE panel_id = ? AND user_id = ?",
        )
        .bind(assignment.panel_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if member == 0 {
            return Err(AppError::Authorization(
                "You are not a member of this panel".to_string(),
            ));
        }

        let task_row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, panel_id, title, description, max_score, order_index, is_required
            FROM panel_tasks
            WHERE id = ?
            "#,
        )
        .bind(task_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
        let task: PanelTask = task_row.try_into()?;

        if task.panel_id != assignment.panel_id {
            return Err(AppError::Validation(
                "Task does not belong to this panel".to_string(),
            ));
        }

        if score < 0 || score > task.max_score {
            return Err(AppError::Validation(format!(
                "Score must be between 0 and {}",
                task.max_score
            )));
        }

        let now = Utc::now();
        let review_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        // Overwrite-on-resubmit keeps scoring idempotent per (member, task).
        sqlx::query(
            r#"
            INSERT INTO panel_reviews
                (id, panel_assignment_id, panel_member_id, panel_task_id,
                 score, comment, reviewed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(panel_assignment_id, panel_member_id, panel_task_id)
            DO UPDATE SET score = excluded.score,
                          comment = excluded.comment,
                          reviewed_at = excluded.reviewed_at
            "#,
        )
        .bind(review_id.to_string())
        .bind(assignment_id.to_string())
        .bind(user_id.to_string())
        .bind(task_id.to_string())
        .bind(score)
        .bind(&comment)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Required tasks this member has not yet scored on this assignment.
        let unreviewed_required: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM panel_tasks t
            WHERE t.panel_id = ? AND t.is_required = 1
              AND NOT EXISTS (
                  SELECT 1 FROM panel_reviews r
                  WHERE r.panel_assignment_id = ?
                    AND r.panel_member_id = ?
                    AND r.panel_task_id = t.id
              )
            "#,
        )
        .bind(assignment.panel_id.to_string())
        .bind(assignment_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let mut assignment_status = assignment.status;
        let mut nomination_promoted = false;

        if unreviewed_required == 0 && assignment.status != AssignmentStatus::Completed {
            sqlx::query(
                "UPDATE panel_assignments SET status = 'COMPLETED', completed_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(assignment_id.to_string())
            .execute(&mut *tx)
            .await?;
            assignment_status = AssignmentStatus::Completed;

            let pending: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM panel_assignments WHERE nomination_id = ? AND status != 'COMPLETED'",
            )
            .bind(assignment.nomination_id.to_string())
            .fetch_one(&mut *tx)
            .await?;

            if pending == 0 {
                sqlx::query(
                    "UPDATE nominations SET status = 'HR_REVIEW', updated_at = ? WHERE id = ? AND status = 'PANEL_REVIEW'",
                )
                .bind(now)
                .bind(assignment.nomination_id.to_string())
                .execute(&mut *tx)
                .await?;
                nomination_promoted = true;
            }
        }

        tx.commit().await?;

        if nomination_promoted {
            tracing::info!(
                nomination_id = %assignment.nomination_id,
                "All panel assignments complete, nomination moved to HR_REVIEW"
            );
        }

        // The upsert may have kept the original row id; refetch for accuracy.
        let review = self
            .fetch_review(assignment_id, user_id, task_id)
            .await?;

        Ok(ReviewOutcome {
            review,
            assignment_status,
            nomination_promoted,
        })
    }

    /// Assignments for panels the given user sits on, with the user's own
    /// review state per task.
    pub async fn my_assignments(&self, user_id: Uuid) -> Result<Vec<MyAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentWithPanelRow>(
            r#"
            SELECT pa.id, pa.nomination_id, pa.panel_id, pa.assigned_by,
                   pa.status, pa.assigned_at, pa.completed_at, p.name AS panel_name
            FROM panel_assignments pa
            JOIN panels p ON p.id = pa.panel_id
            JOIN panel_members pm ON pm.panel_id = pa.panel_id
            WHERE pm.user_id = ?
            ORDER BY pa.assigned_at DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let panel_name = row.panel_name.clone();
            let assignment: PanelAssignment = row.try_into()?;
            let tasks = self.list_panel_tasks(assignment.panel_id).await?;

            let mut with_reviews = Vec::with_capacity(tasks.len());
            for task in tasks {
                let review = self
                    .try_fetch_review(assignment.id, user_id, task.id)
                    .await?;
                with_reviews.push(TaskWithReview { task, review });
            }

            let completed_tasks = with_reviews.iter().filter(|t| t.review.is_some()).count();
            let total_tasks = with_reviews.len();
            out.push(MyAssignment {
                assignment,
                panel_name,
                tasks: with_reviews,
                completed_tasks,
                total_tasks,
            });
        }

        Ok(out)
    }

    /// Every assignment with coverage figures; the HR progress view.
    pub async fn all_assignments(&self) -> Result<Vec<AssignmentCoverage>> {
        let rows = sqlx::query_as::<_, CoverageRow>(
            r#"
            SELECT pa.id, pa.nomination_id, pa.panel_id, pa.assigned_by,
                   pa.status, pa.assigned_at, pa.completed_at, p.name AS panel_name,
                   (SELECT COUNT(*) FROM panel_reviews r
                     WHERE r.panel_assignment_id = pa.id) AS review_count,
                   (SELECT COUNT(*) FROM panel_tasks t WHERE t.panel_id = pa.panel_id)
                     * (SELECT COUNT(*) FROM panel_members m WHERE m.panel_id = pa.panel_id)
                     AS expected_reviews
            FROM panel_assignments pa
            JOIN panels p ON p.id = pa.panel_id
            ORDER BY pa.assigned_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn fetch_assignment(&self, id: Uuid) -> Result<PanelAssignment> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, nomination_id, panel_id, assigned_by, status,
                   assigned_at, completed_at
            FROM panel_assignments
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

        row.try_into()
    }

    async fn fetch_review(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<PanelReview> {
        self.try_fetch_review(assignment_id, user_id, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
    }

    async fn try_fetch_review(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<PanelReview>> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, panel_assignment_id, panel_member_id, panel_task_id,
                   score, comment, reviewed_at
            FROM panel_reviews
            WHERE panel_assignment_id = ? AND panel_member_id = ? AND panel_task_id = ?
            "#,
        )
        .bind(assignment_id.to_string())
        .bind(user_id.to_string())
        .bind(task_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct PanelRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<PanelRow> for Panel {
    type Error = AppError;

    fn try_from(row: PanelRow) -> Result<Self> {
        Ok(Panel {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: String,
    panel_id: String,
    user_id: String,
    role: String,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<MemberRow> for PanelMember {
    type Error = AppError;

    fn try_from(row: MemberRow) -> Result<Self> {
        Ok(PanelMember {
            id: parse_uuid(&row.id)?,
            panel_id: parse_uuid(&row.panel_id)?,
            user_id: parse_uuid(&row.user_id)?,
            role: row
                .role
                .parse::<PanelMemberRole>()
                .map_err(AppError::Validation)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    panel_id: String,
    title: String,
    description: Option<String>,
    max_score: i64,
    order_index: i64,
    is_required: bool,
}

impl TryFrom<TaskRow> for PanelTask {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(PanelTask {
            id: parse_uuid(&row.id)?,
            panel_id: parse_uuid(&row.panel_id)?,
            title: row.title,
            description: row.description,
            max_score: row.max_score,
            order_index: row.order_index,
            is_required: row.is_required,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: String,
    nomination_id: String,
    panel_id: String,
    assigned_by: String,
    status: String,
    assigned_at: chrono::DateTime<Utc>,
    completed_at: Option<chrono::DateTime<Utc>>,
}

impl TryFrom<AssignmentRow> for PanelAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self> {
        Ok(PanelAssignment {
            id: parse_uuid(&row.id)?,
            nomination_id: parse_uuid(&row.nomination_id)?,
            panel_id: parse_uuid(&row.panel_id)?,
            assigned_by: parse_uuid(&row.assigned_by)?,
            status: row
                .status
                .parse::<AssignmentStatus>()
                .map_err(AppError::Validation)?,
            assigned_at: row.assigned_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentWithPanelRow {
    id: String,
    nomination_id: String,
    panel_id: String,
    assigned_by: String,
    status: String,
    assigned_at: chrono::DateTime<Utc>,
    completed_at: Option<chrono::DateTime<Utc>>,
    panel_name: String,
}

impl TryFrom<AssignmentWithPanelRow> for PanelAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentWithPanelRow) -> Result<Self> {
        AssignmentRow {
            id: row.id,
            nomination_id: row.nomination_id,
            panel_id: row.panel_id,
            assigned_by: row.assigned_by,
            status: row.status,
            assigned_at: row.assigned_at,
            completed_at: row.completed_at,
        }
        .try_into()
    }
}

#[derive(sqlx::FromRow)]
struct CoverageRow {
    id: String,
    nomination_id: String,
    panel_id: String,
    assigned_by: String,
    status: String,
    assigned_at: chrono::DateTime<Utc>,
    completed_at: Option<chrono::DateTime<Utc>>,
    panel_name: String,
    review_count: i64,
    expected_reviews: i64,
}

impl TryFrom<CoverageRow> for AssignmentCoverage {
    type Error = AppError;

    fn try_from(row: CoverageRow) -> Result<Self> {
        let panel_name = row.panel_name.clone();
        let assignment = AssignmentRow {
            id: row.id,
            nomination_id: row.nomination_id,
            panel_id: row.panel_id,
            assigned_by: row.assigned_by,
            status: row.status,
            assigned_at: row.assigned_at,
            completed_at: row.completed_at,
        }
        .try_into()?;

        Ok(AssignmentCoverage {
            assignment,
            panel_name,
            review_count: row.review_count,
            expected_reviews: row.expected_reviews,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    panel_assignment_id: String,
    panel_member_id: String,
    panel_task_id: String,
    score: i64,
    comment: Option<String>,
    reviewed_at: chrono::DateTime<Utc>,
}

impl TryFrom<ReviewRow> for PanelReview {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> Result<Self> {
        Ok(PanelReview {
            id: parse_uuid(&row.id)?,
            panel_assignment_id: parse_uuid(&row.panel_assignment_id)?,
            panel_member_id: parse_uuid(&row.panel_member_id)?,
            panel_task_id: parse_uuid(&row.panel_task_id)?,
            score: row.score,
            comment: row.comment,
            reviewed_at: row.reviewed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnswerInput, CreateCycleRequest, CreateFormRequest, CreateNominationRequest,
        CreateUserRequest, CycleStatus, FieldSpec, UserRole,
    };
    use crate::store::testutil::setup_test_store;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: Store,
        hr: Uuid,
        reviewer: Uuid,
        nomination_id: Uuid,
        panel_id: Uuid,
        task_ids: Vec<Uuid>,
    }

    /// One OPEN cycle, one submitted nomination, one panel with a reviewer
    /// and two required tasks.
    async fn fixture() -> Fixture {
        let store = setup_test_store().await;

        let new_user = |name: &str, role: UserRole| {
            let store = store.clone();
            let name = name.to_string();
            async move {
                store
                    .create_user(CreateUserRequest {
                        employee_code: None,
                        name: name.clone(),
                        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                        role,
                    })
                    .await
                    .unwrap()
                    .id
            }
        };

        let hr = new_user("Hr Lead", UserRole::Hr).await;
        let manager = new_user("Manager", UserRole::Manager).await;
        let nominee = new_user("Nominee", UserRole::Employee).await;
        let reviewer = new_user("Reviewer", UserRole::Employee).await;

        let cycle_id = store
            .create_cycle(CreateCycleRequest {
                name: "Q1 Awards".to_string(),
                description: None,
                quarter: "Q1 2026".to_string(),
                year: 2026,
                start_date: date(2026, 1, 1),
                end_date: date(2026, 3, 31),
                status: Some(CycleStatus::Open),
                award_type_id: None,
            })
            .await
            .unwrap()
            .id;

        let form_id = store
            .create_form(CreateFormRequest {
                name: "Peer Award".to_string(),
                description: None,
                fields: vec![FieldSpec {
                    label: "Impact".to_string(),
                    field_key: "impact".to_string(),
                    field_type: "TEXT".to_string(),
                    is_required: true,
                    order_index: 0,
                    options: None,
                    validation: None,
                }],
            })
            .await
            .unwrap()
            .id;

        let nomination_id = store
            .submit_nomination(
                manager,
                CreateNominationRequest {
                    cycle_id,
                    form_id,
                    nominee_id: nominee,
                    answers: vec![AnswerInput {
                        field_key: "impact".to_string(),
                        value: serde_json::json!("shipped the thing"),
                    }],
                },
                date(2026, 2, 1),
            )
            .await
            .unwrap()
            .id;

        let panel_id = store
            .create_panel(CreatePanelRequest {
                name: "Tech Panel".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id;

        store
            .add_panel_member(panel_id, reviewer, PanelMemberRole::Reviewer)
            .await
            .unwrap();

        let mut task_ids = Vec::new();
        for title in ["Impact", "Execution"] {
            let task = store
                .add_panel_task(
                    panel_id,
                    CreateTaskRequest {
                        title: title.to_string(),
                        description: None,
                        max_score: 5,
                        order_index: 0,
                        is_required: true,
                    },
                )
                .await
                .unwrap();
            task_ids.push(task.id);
        }

        Fixture {
            store,
            hr,
            reviewer,
            nomination_id,
            panel_id,
            task_ids,
        }
    }

    #[tokio::test]
    async fn test_assign_panels_moves_nomination_to_panel_review() {
        let fx = fixture().await;
        let assignments = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].status, AssignmentStatus::Pending);

        let nomination = fx.store.fetch_nomination(fx.nomination_id).await.unwrap();
        assert_eq!(nomination.status, NominationStatus::PanelReview);
    }

    #[tokio::test]
    async fn test_assign_panels_rejects_all_duplicates() {
        let fx = fixture().await;
        fx.store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap();

        let result = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_assign_panels_skips_existing_keeps_new() {
        let fx = fixture().await;
        fx.store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap();

        let second_panel = fx
            .store
            .create_panel(CreatePanelRequest {
                name: "Culture Panel".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id;

        let assignments = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id, second_panel], fx.hr)
            .await
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].panel_id, second_panel);
    }

    #[tokio::test]
    async fn test_review_completes_assignment_and_promotes_nomination() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        let outcome = fx
            .store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 4, None)
            .await
            .unwrap();
        assert_eq!(outcome.assignment_status, AssignmentStatus::Pending);
        assert!(!outcome.nomination_promoted);

        let outcome = fx
            .store
            .submit_review(
                assignment.id,
                fx.task_ids[1],
                fx.reviewer,
                5,
                Some("strong".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.assignment_status, AssignmentStatus::Completed);
        assert!(outcome.nomination_promoted);

        let nomination = fx.store.fetch_nomination(fx.nomination_id).await.unwrap();
        assert_eq!(nomination.status, NominationStatus::HrReview);
    }

    #[tokio::test]
    async fn test_review_resubmission_overwrites_score() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        fx.store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 2, None)
            .await
            .unwrap();
        let outcome = fx
            .store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 5, None)
            .await
            .unwrap();
        assert_eq!(outcome.review.score, 5);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM panel_reviews WHERE panel_assignment_id = ?")
                .bind(assignment.id.to_string())
                .fetch_one(fx.store.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_review_rejects_non_member() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        let result = fx
            .store
            .submit_review(assignment.id, fx.task_ids[0], fx.hr, 3, None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_review_rejects_out_of_range_score() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        let result = fx
            .store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 6, None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        let result = fx
            .store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, -1, None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_review_rejects_task_from_other_panel() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        let other_panel = fx
            .store
            .create_panel(CreatePanelRequest {
                name: "Culture Panel".to_string(),
                description: None,
            })
            .await
            .unwrap()
            .id;
        let foreign_task = fx
            .store
            .add_panel_task(
                other_panel,
                CreateTaskRequest {
                    title: "Values".to_string(),
                    description: None,
                    max_score: 5,
                    order_index: 0,
                    is_required: true,
                },
            )
            .await
            .unwrap()
            .id;

        let result = fx
            .store
            .submit_review(assignment.id, foreign_task, fx.reviewer, 3, None)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_optional_task_does_not_block_completion() {
        let fx = fixture().await;
        fx.store
            .add_panel_task(
                fx.panel_id,
                CreateTaskRequest {
                    title: "Bonus".to_string(),
                    description: None,
                    max_score: 5,
                    order_index: 0,
                    is_required: false,
                },
            )
            .await
            .unwrap();

        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        fx.store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 4, None)
            .await
            .unwrap();
        let outcome = fx
            .store
            .submit_review(assignment.id, fx.task_ids[1], fx.reviewer, 4, None)
            .await
            .unwrap();

        // Both required tasks scored; the optional one is irrelevant.
        assert_eq!(outcome.assignment_status, AssignmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_my_assignments_reports_review_progress() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        fx.store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 4, None)
            .await
            .unwrap();

        let mine = fx.store.my_assignments(fx.reviewer).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].panel_name, "Tech Panel");
        assert_eq!(mine[0].tasks.len(), 2);

        assert_eq!(mine[0].completed_tasks, 1);
        assert_eq!(mine[0].total_tasks, 2);

        // Non-members see nothing.
        let none = fx.store.my_assignments(fx.hr).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_all_assignments_coverage() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        fx.store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 4, None)
            .await
            .unwrap();

        let all = fx.store.all_assignments().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].review_count, 1);
        // 2 tasks x 1 member
        assert_eq!(all[0].expected_reviews, 2);
    }

    #[tokio::test]
    async fn test_reviewer_sees_nomination_only_after_reviewing() {
        let fx = fixture().await;
        let assignment = fx
            .store
            .assign_panels(fx.nomination_id, &[fx.panel_id], fx.hr)
            .await
            .unwrap()
            .remove(0);

        let reviewer_identity = crate::identity::Identity {
            user_id: fx.reviewer,
            role: UserRole::Employee,
            panel_member: true,
        };
        let visible = fx
            .store
            .list_nominations(reviewer_identity, None, None)
            .await
            .unwrap();
        assert!(visible.is_empty());

        fx.store
            .submit_review(assignment.id, fx.task_ids[0], fx.reviewer, 4, None)
            .await
            .unwrap();

        let visible = fx
            .store
            .list_nominations(reviewer_identity, None, None)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, fx.nomination_id);
    }

    #[tokio::test]
    async fn test_add_duplicate_member_conflicts() {
        let fx = fixture().await;
        let result = fx
            .store
            .add_panel_member(fx.panel_id, fx.reviewer, PanelMemberRole::Chair)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
    }
}
