//! Nomination submission and lifecycle
//!
//! Submission is the heavily gated path: cycle window, form and nominee
//! existence, answer completeness, and the one-open-nomination-per-nominee
//! rule all apply before anything is written. The nomination and its
//! answers land in one transaction.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::models::{
    CreateNominationRequest, CycleStatus, FormAnswer, Nomination, NominationStatus, UserRole,
};

use super::users::parse_uuid;
use super::{is_unique_violation, Store};

/// A nomination together with its recorded answers.
#[derive(Debug, Serialize)]
pub struct NominationDetail {
    #[serde(flatten)]
    pub nomination: Nomination,
    pub answers: Vec<FormAnswer>,
}

impl Store {
    /// Submit a nomination. All gates run against current state and the
    /// caller-supplied `today` so the window check is testable.
    pub async fn submit_nomination(
        &self,
        nominator: Uuid,
        req: CreateNominationRequest,
        today: NaiveDate,
    ) -> Result<Nomination> {
        let cycle = match self.get_cycle(req.cycle_id).await {
            Ok(cycle) => cycle,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::NotFound("Cycle not found".to_string()))
            }
            Err(err) => return Err(err),
        };

        if cycle.status.is_pre_open() {
            return Err(AppError::State(
                "Nomination window is not yet open for this cycle".to_string(),
            ));
        }
        if matches!(cycle.status, CycleStatus::Closed | CycleStatus::Finalized) {
            return Err(AppError::State(
                "Nomination window is already closed for this cycle".to_string(),
            ));
        }
        if today < cycle.start_date || today > cycle.end_date {
            return Err(AppError::State(
                "Nomination window is closed for this cycle".to_string(),
            ));
        }

        let (_, fields) = match self.get_form(req.form_id).await {
            Ok(pair) => pair,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::NotFound("Form not found".to_string()))
            }
            Err(err) => return Err(err),
        };

        let nominee = match self.get_user(req.nominee_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::NotFound("Invalid nominee".to_string()))
            }
            Err(err) => return Err(err),
        };
        if !nominee.is_active {
            return Err(AppError::NotFound("Invalid nominee".to_string()));
        }

        let open_exists: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM nominations
            WHERE cycle_id = ? AND nominee_id = ?
              AND status IN ('SUBMITTED', 'PANEL_REVIEW', 'HR_REVIEW')
            "#,
        )
        .bind(req.cycle_id.to_string())
        .bind(req.nominee_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if open_exists > 0 {
            return Err(AppError::Conflict(
                "Nomination already exists for this employee".to_string(),
            ));
        }

        // Answers must cover every required key and introduce no unknown keys.
        let known: std::collections::HashSet<&str> =
            fields.iter().map(|f| f.field_key.as_str()).collect();
        let supplied: std::collections::HashSet<&str> =
            req.answers.iter().map(|a| a.field_key.as_str()).collect();

        if let Some(unknown) = req.answers.iter().find(|a| !known.contains(a.field_key.as_str()))
        {
            return Err(AppError::Validation(format!(
                "Unknown field key: {}",
                unknown.field_key
            )));
        }

        let mut missing: Vec<&str> = fields
            .iter()
            .filter(|f| f.is_required && !supplied.contains(f.field_key.as_str()))
            .map(|f| f.field_key.as_str())
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO nominations
                (id, cycle_id, form_id, nominee_id, nominated_by_id, status,
                 submitted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'SUBMITTED', ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(req.cycle_id.to_string())
        .bind(req.form_id.to_string())
        .bind(req.nominee_id.to_string())
        .bind(nominator.to_string())
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            // Concurrent submit for the same nominee races to this index.
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(
                    "Nomination already exists for this employee".to_string(),
                ));
            }
            return Err(err.into());
        }

        for answer in &req.answers {
            let value = serde_json::to_string(&answer.value)
                .map_err(|e| AppError::Validation(format!("Invalid answer value: {}", e)))?;
            sqlx::query(
                "INSERT INTO form_answers (id, nomination_id, field_key, value) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(&answer.field_key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            nomination_id = %id,
            cycle_id = %req.cycle_id,
            nominee_id = %req.nominee_id,
            "Nomination submitted"
        );

        Ok(Nomination {
            id,
            cycle_id: req.cycle_id,
            form_id: req.form_id,
            nominee_id: req.nominee_id,
            nominated_by_id: nominator,
            status: NominationStatus::Submitted,
            submitted_at: Some(now),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_nomination(&self, id: Uuid) -> Result<NominationDetail> {
        let nomination = self.fetch_nomination(id).await?;

        let answers = sqlx::query_as::<_, AnswerRow>(
            "SELECT field_key, value FROM form_answers WHERE nomination_id = ? ORDER BY field_key",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let answers = answers
            .into_iter()
            .map(|r| r.try_into())
            .collect::<Result<Vec<FormAnswer>>>()?;

        Ok(NominationDetail {
            nomination,
            answers,
        })
    }

    /// Role-scoped listing: HR sees everything, managers see what they
    /// nominated, panel members see nominations assigned to their panels.
    pub async fn list_nominations(
        &self,
        identity: Identity,
        cycle_id: Option<Uuid>,
        status: Option<NominationStatus>,
    ) -> Result<Vec<Nomination>> {
        let mut sql = String::from(
            r#"
            SELECT DISTINCT n.id, n.cycle_id, n.form_id, n.nominee_id,
                   n.nominated_by_id, n.status, n.submitted_at,
                   n.created_at, n.updated_at
            FROM nominations n
            "#,
        );
        let mut binds: Vec<String> = Vec::new();

        match identity.role {
            UserRole::Hr => {
                sql.push_str(" WHERE 1 = 1");
            }
            UserRole::Manager => {
                sql.push_str(" WHERE n.nominated_by_id = ?");
                binds.push(identity.user_id.to_string());
            }
            // Panel members (by capability, whatever their primary role)
            // see only nominations they have actually reviewed.
            _ => {
                sql.push_str(
                    r#"
                    JOIN panel_assignments pa ON pa.nomination_id = n.id
                    JOIN panel_reviews r ON r.panel_assignment_id = pa.id
                    WHERE r.panel_member_id = ?
                    "#,
                );
                binds.push(identity.user_id.to_string());
            }
        }

        if let Some(cycle_id) = cycle_id {
            sql.push_str(" AND n.cycle_id = ?");
            binds.push(cycle_id.to_string());
        }
        if let Some(status) = status {
            sql.push_str(" AND n.status = ?");
            binds.push(status.as_str().to_string());
        }
        sql.push_str(" ORDER BY n.created_at DESC");

        let mut query = sqlx::query_as::<_, NominationRow>(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Move a nomination to a new status. FINALIZED is only reachable from
    /// HR_REVIEW while the cycle is CLOSED or FINALIZED.
    pub async fn update_nomination_status(
        &self,
        id: Uuid,
        new_status: NominationStatus,
    ) -> Result<Nomination> {
        let mut nomination = self.fetch_nomination(id).await?;

        if new_status == NominationStatus::Finalized {
            if nomination.status != NominationStatus::HrReview {
                return Err(AppError::State(
                    "Nomination must be in HR_REVIEW to be finalized".to_string(),
                ));
            }
            let cycle = self.get_cycle(nomination.cycle_id).await?;
            if !matches!(cycle.status, CycleStatus::Closed | CycleStatus::Finalized) {
                return Err(AppError::State(
                    "Cycle must be closed before nominations are finalized".to_string(),
                ));
            }
        }

        let now = Utc::now();
        sqlx::query("UPDATE nominations SET status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::info!(nomination_id = %id, status = new_status.as_str(), "Nomination status updated");

        nomination.status = new_status;
        nomination.updated_at = now;
        Ok(nomination)
    }

    /// Delete a nomination and everything hanging off it. Refused while an
    /// active award references it.
    pub async fn delete_nomination(&self, id: Uuid) -> Result<()> {
        self.fetch_nomination(id).await?;

        let awarded: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM awards WHERE nomination_id = ? AND is_active = 1",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if awarded > 0 {
            return Err(AppError::Conflict(
                "Cannot delete a nomination with an active award".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM panel_reviews
            WHERE panel_assignment_id IN (
                SELECT id FROM panel_assignments WHERE nomination_id = ?
            )
            "#,
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM panel_assignments WHERE nomination_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM form_answers WHERE nomination_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM nominations WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(nomination_id = %id, "Nomination deleted");
        Ok(())
    }

    /// Delete every nomination in a cycle with the same cascade and the
    /// same active-award refusal as single deletion.
    pub async fn delete_nominations_for_cycle(&self, cycle_id: Uuid) -> Result<u64> {
        self.get_cycle(cycle_id).await?;

        let awarded: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM awards WHERE cycle_id = ? AND is_active = 1",
        )
        .bind(cycle_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if awarded > 0 {
            return Err(AppError::Conflict(
                "Cannot delete nominations with active awards".to_string(),
            ));
        }

        let cycle_key = cycle_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM panel_reviews
            WHERE panel_assignment_id IN (
                SELECT pa.id FROM panel_assignments pa
                JOIN nominations n ON n.id = pa.nomination_id
                WHERE n.cycle_id = ?
            )
            "#,
        )
        .bind(&cycle_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM panel_assignments WHERE nomination_id IN (SELECT id FROM nominations WHERE cycle_id = ?)",
        )
        .bind(&cycle_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM form_answers WHERE nomination_id IN (SELECT id FROM nominations WHERE cycle_id = ?)",
        )
        .bind(&cycle_key)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM nominations WHERE cycle_id = ?")
            .bind(&cycle_key)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::info!(cycle_id = %cycle_id, deleted, "Cycle nominations deleted");
        Ok(deleted)
    }

    pub(crate) async fn fetch_nomination(&self, id: Uuid) -> Result<Nomination> {
        let row = sqlx::query_as::<_, NominationRow>(
            r#"
            SELECT id, cycle_id, form_id, nominee_id, nominated_by_id, status,
                   submitted_at, created_at, updated_at
            FROM nominations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Nomination not found".to_string()))?;

        row.try_into()
    }
}

#[derive(sqlx::FromRow)]
struct NominationRow {
    id: String,
    cycle_id: String,
    form_id: String,
    nominee_id: String,
    nominated_by_id: String,
    status: String,
    submitted_at: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl TryFrom<NominationRow> for Nomination {
    type Error = AppError;

    fn try_from(row: NominationRow) -> Result<Self> {
        Ok(Nomination {
            id: parse_uuid(&row.id)?,
            cycle_id: parse_uuid(&row.cycle_id)?,
            form_id: parse_uuid(&row.form_id)?,
            nominee_id: parse_uuid(&row.nominee_id)?,
            nominated_by_id: parse_uuid(&row.nominated_by_id)?,
            status: row
                .status
                .parse::<NominationStatus>()
                .map_err(AppError::Validation)?,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    field_key: String,
    value: String,
}

impl TryFrom<AnswerRow> for FormAnswer {
    type Error = AppError;

    fn try_from(row: AnswerRow) -> Result<Self> {
        let value = serde_json::from_str(&row.value)
            .map_err(|e| AppError::Validation(format!("Corrupt answer value: {}", e)))?;
        Ok(FormAnswer {
            field_key: row.field_key,
            value,
        })
    }
}
