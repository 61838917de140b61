//! Cycle lifecycle operations
//!
//! Cycles move forward only: DRAFT/ACTIVE -> OPEN -> CLOSED -> FINALIZED.
//! Closing early with `drop_cycle` cascades deletion of every row the cycle
//! owns (reviews, assignments, answers, awards, nominations) in one
//! transaction before the status change commits.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{CreateCycleRequest, Cycle, CycleStatus, UpdateCycleRequest};

use super::users::parse_uuid;
use super::Store;

impl Store {
    pub async fn create_cycle(&self, req: CreateCycleRequest) -> Result<Cycle> {
        if req.end_date < req.start_date {
            return Err(AppError::Validation(
                "End date must be after start date".to_string(),
            ));
        }

        if let Some(award_type_id) = req.award_type_id {
            let active: Option<bool> =
                sqlx::query_scalar("SELECT is_active FROM award_types WHERE id = ?")
                    .bind(award_type_id.to_string())
                    .fetch_optional(&self.pool)
                    .await?;
            if active != Some(true) {
                return Err(AppError::NotFound(
                    "Award type not found or inactive".to_string(),
                ));
            }
        }

        let id = Uuid::new_v4();
        let status = req.status.unwrap_or(CycleStatus::Draft);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO cycles
                (id, name, description, quarter, year, start_date, end_date,
                 status, award_type_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.quarter)
        .bind(req.year)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(status.as_str())
        .bind(req.award_type_id.map(|u| u.to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(cycle_id = %id, status = status.as_str(), "Cycle created");

        Ok(Cycle {
            id,
            name: req.name,
            description: req.description,
            quarter: req.quarter,
            year: req.year,
            start_date: req.start_date,
            end_date: req.end_date,
            status,
            award_type_id: req.award_type_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_cycle(&self, id: Uuid) -> Result<Cycle> {
        let row = sqlx::query_as::<_, CycleRow>(
            r#"
            SELECT id, name, description, quarter, year, start_date, end_date,
                   status, award_type_id, is_active, created_at, updated_at
            FROM cycles
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Cycle does not exist".to_string()))?;

        row.try_into()
    }

    pub async fn list_cycles(&self, status: Option<CycleStatus>) -> Result<Vec<Cycle>> {
        let rows = match status {
            Some(s) => {
                sqlx::query_as::<_, CycleRow>(
                    r#"
                    SELECT id, name, description, quarter, year, start_date, end_date,
                           status, award_type_id, is_active, created_at, updated_at
                    FROM cycles
                    WHERE is_active = 1 AND status = ?
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(s.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CycleRow>(
                    r#"
                    SELECT id, name, description, quarter, year, start_date, end_date,
                           status, award_type_id, is_active, created_at, updated_at
                    FROM cycles
                    WHERE is_active = 1
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Apply a partial update. A status change to CLOSED before the end
    /// date with `drop_cycle=true` cascades deletion of all cycle-scoped
    /// data; without the flag it is an ordinary early close.
    pub async fn update_cycle(
        &self,
        id: Uuid,
        patch: UpdateCycleRequest,
        today: NaiveDate,
    ) -> Result<Cycle> {
        let mut cycle = self.get_cycle(id).await?;

        if let Some(name) = patch.name {
            cycle.name = name;
        }
        if let Some(description) = patch.description {
            cycle.description = Some(description);
        }
        if let Some(start_date) = patch.start_date {
            cycle.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            cycle.end_date = end_date;
        }
        if cycle.end_date < cycle.start_date {
            return Err(AppError::Validation(
                "End date must be after start date".to_string(),
            ));
        }

        let mut drop_requested = false;
        if let Some(target) = patch.status {
            if !cycle.status.can_transition_to(target) {
                return Err(AppError::State(format!(
                    "Cannot move cycle from {} to {}",
                    cycle.status.as_str(),
                    target.as_str()
                )));
            }
            drop_requested =
                target == CycleStatus::Closed && today < cycle.end_date && patch.drop_cycle;
            cycle.status = target;
        }

        cycle.updated_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        if drop_requested {
            // Destructive early close: clear dependents in FK order before
            // the status change commits. One transaction, all or nothing.
            let cycle_key = id.to_string();

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
                r#"
                DELETE FROM panel_assignments
                WHERE nomination_id IN (SELECT id FROM nominations WHERE cycle_id = ?)
                "#,
            )
            .bind(&cycle_key)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                DELETE FROM form_answers
                WHERE nomination_id IN (SELECT id FROM nominations WHERE cycle_id = ?)
                "#,
            )
            .bind(&cycle_key)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM awards WHERE cycle_id = ?")
                .bind(&cycle_key)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM nominations WHERE cycle_id = ?")
                .bind(&cycle_key)
                .execute(&mut *tx)
                .await?;

            tracing::warn!(cycle_id = %id, "Cycle dropped: cascaded delete of cycle-scoped data");
        }

        sqlx::query(
            r#"
            UPDATE cycles
            SET name = ?, description = ?, start_date = ?, end_date = ?,
                status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&cycle.name)
        .bind(&cycle.description)
        .bind(cycle.start_date)
        .bind(cycle.end_date)
        .bind(cycle.status.as_str())
        .bind(cycle.updated_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cycle)
    }

    /// Move date-driven cycles forward one step: ACTIVE cycles whose window
    /// has started become OPEN, OPEN cycles whose window has passed become
    /// CLOSED. Idempotent; cycles in other states are untouched.
    pub async fn run_cycle_sweep(&self, today: NaiveDate) -> Result<(u64, u64)> {
        let now = Utc::now();

        let opened = sqlx::query(
            r#"
            UPDATE cycles SET status = 'OPEN', updated_at = ?
            WHERE status = 'ACTIVE' AND start_date <= ? AND end_date >= ?
            "#,
        )
        .bind(now)
        .bind(today)
        .bind(today)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let closed = sqlx::query(
            r#"
            UPDATE cycles SET status = 'CLOSED', updated_at = ?
            WHERE status = 'OPEN' AND end_date < ?
            "#,
        )
        .bind(now)
        .bind(today)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if opened > 0 || closed > 0 {
            tracing::info!(opened, closed, "Cycle sweep applied transitions");
        }

        Ok((opened, closed))
    }
}

#[derive(sqlx::FromRow)]
struct CycleRow {
    id: String,
    name: String,
    description: Option<String>,
    quarter: String,
    year: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    award_type_id: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = AppError;

    fn try_from(row: CycleRow) -> Result<Self> {
        let award_type_id = row.award_type_id.as_deref().map(parse_uuid).transpose()?;
        Ok(Cycle {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            quarter: row.quarter,
            year: row.year,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row
                .status
                .parse::<CycleStatus>()
                .map_err(AppError::Validation)?,
            award_type_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
