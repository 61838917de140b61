//! Awards, award types, and cycle finalization
//!
//! Award creation is HR's act of recording a winner; it is gated on the
//! cycle's awarding window and on the nomination being FINALIZED.
//! Finalizing a cycle stamps every active award and locks the cycle in one
//! transaction.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Award, AwardType, CreateAwardRequest, CreateAwardTypeRequest, Cycle, CycleStatus,
    NominationStatus, UpdateAwardRequest,
};

use super::users::parse_uuid;
use super::{is_unique_violation, Store};

/// A nomination with its aggregate panel score; the ranking view.
#[derive(Debug, Serialize)]
pub struct ScoredNomination {
    pub nomination_id: Uuid,
    pub nominee_id: Uuid,
    pub status: NominationStatus,
    /// None until at least one review exists
    pub average_score: Option<f64>,
    pub review_count: i64,
}

/// HR's finalization dashboard row: panel completion per nomination.
#[derive(Debug, Serialize)]
pub struct NominationSummary {
    pub nomination_id: Uuid,
    pub nominee_id: Uuid,
    pub status: NominationStatus,
    pub average_score: Option<f64>,
    pub panel_count: i64,
    pub completed_panels: i64,
    pub ready_for_finalization: bool,
}

impl Store {
    pub async fn create_award(&self, req: CreateAwardRequest) -> Result<Award> {
        let cycle = self.get_cycle(req.cycle_id).await?;
        if !cycle.status.in_awarding_window() {
            return Err(AppError::State(
                "Cycle is not open for awarding".to_string(),
            ));
        }

        let nomination = self.fetch_nomination(req.nomination_id).await?;
        if nomination.cycle_id != req.cycle_id {
            return Err(AppError::Validation(
                "Nomination does not belong to this cycle".to_string(),
            ));
        }
        if nomination.status != NominationStatus::Finalized {
            return Err(AppError::State(
                "Nomination must be FINALIZED before creating an award".to_string(),
            ));
        }

        let winner = self.get_user(req.winner_id).await?;
        if !winner.is_active {
            return Err(AppError::NotFound("Invalid winner".to_string()));
        }
        if req.winner_id != nomination.nominee_id {
            return Err(AppError::Validation(
                "Winner must be the nominee".to_string(),
            ));
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM awards WHERE nomination_id = ? AND is_active = 1",
        )
        .bind(req.nomination_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Err(AppError::Conflict(
                "Award already exists for this nomination".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO awards
                (id, cycle_id, nomination_id, winner_id, award_type, rank,
                 comment, is_active, finalized_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, NULL, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(req.cycle_id.to_string())
        .bind(req.nomination_id.to_string())
        .bind(req.winner_id.to_string())
        .bind(&req.award_type)
        .bind(req.rank)
        .bind(&req.comment)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(err) = inserted {
            // The partial index backs the count check against races.
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(
                    "Award already exists for this nomination".to_string(),
                ));
            }
            return Err(err.into());
        }

        tracing::info!(award_id = %id, cycle_id = %req.cycle_id, winner_id = %req.winner_id, "Award created");

        Ok(Award {
            id,
            cycle_id: req.cycle_id,
            nomination_id: req.nomination_id,
            winner_id: req.winner_id,
            award_type: req.award_type,
            rank: req.rank,
            comment: req.comment,
            is_active: true,
            finalized_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_award(&self, id: Uuid) -> Result<Award> {
        let row = sqlx::query_as::<_, AwardRow>(
            r#"
            SELECT id, cycle_id, nomination_id, winner_id, award_type, rank,
                   comment, is_active, finalized_at, created_at, updated_at
            FROM awards
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Award not found".to_string()))?;

        row.try_into()
    }

    pub async fn list_awards(&self, cycle_id: Option<Uuid>) -> Result<Vec<Award>> {
        let rows = match cycle_id {
            Some(cycle_id) => {
                sqlx::query_as::<_, AwardRow>(
                    r#"
                    SELECT id, cycle_id, nomination_id, winner_id, award_type, rank,
                           comment, is_active, finalized_at, created_at, updated_at
                    FROM awards
                    WHERE is_active = 1 AND cycle_id = ?
                    ORDER BY rank, created_at
                    "#,
                )
                .bind(cycle_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AwardRow>(
                    r#"
                    SELECT id, cycle_id, nomination_id, winner_id, award_type, rank,
                           comment, is_active, finalized_at, created_at, updated_at
                    FROM awards
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

    /// Awards are editable only after the cycle is FINALIZED; before that
    /// the record is still provisional and corrections go through delete
    /// and re-create.
    pub async fn update_award(&self, id: Uuid, patch: UpdateAwardRequest) -> Result<Award> {
        let mut award = self.get_award(id).await?;

        let cycle = self.get_cycle(award.cycle_id).await?;
        if cycle.status != CycleStatus::Finalized {
            return Err(AppError::State(
                "Awards can only be updated after the cycle is finalized".to_string(),
            ));
        }

        if let Some(award_type) = patch.award_type {
            award.award_type = Some(award_type);
        }
        if let Some(rank) = patch.rank {
            award.rank = Some(rank);
        }
        if let Some(comment) = patch.comment {
            award.comment = Some(comment);
        }
        award.updated_at = Utc::now();

        sqlx::query(
            "UPDATE awards SET award_type = ?, rank = ?, comment = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&award.award_type)
        .bind(award.rank)
        .bind(&award.comment)
        .bind(award.updated_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(award)
    }

    /// Finalize a cycle: stamp every active award and lock the cycle.
    /// Refused when the cycle has no awards to finalize.
    pub async fn finalize_cycle(&self, cycle_id: Uuid) -> Result<Cycle> {
        let mut cycle = self.get_cycle(cycle_id).await?;

        if cycle.status == CycleStatus::Finalized {
            return Err(AppError::Conflict("Cycle already finalized".to_string()));
        }

        let award_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM awards WHERE cycle_id = ? AND is_active = 1",
        )
        .bind(cycle_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        if award_count == 0 {
            return Err(AppError::Conflict(
                "No awards found for this cycle".to_string(),
            ));
        }

        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE awards SET finalized_at = ?, updated_at = ? WHERE cycle_id = ? AND is_active = 1",
        )
        .bind(now)
        .bind(now)
        .bind(cycle_id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE cycles SET status = 'FINALIZED', updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(cycle_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(cycle_id = %cycle_id, awards = award_count, "Cycle finalized");

        cycle.status = CycleStatus::Finalized;
        cycle.updated_at = now;
        Ok(cycle)
    }

    /// Nominations under review or beyond, ranked by average panel score.
    /// Unscored nominations sort last and report a null average.
    pub async fn nominations_with_scores(&self, cycle_id: Uuid) -> Result<Vec<ScoredNomination>> {
        self.get_cycle(cycle_id).await?;

        let rows = sqlx::query_as::<_, ScoredRow>(
            r#"
            SELECT n.id AS nomination_id, n.nominee_id, n.status,
                   AVG(r.score) AS average_score,
                   COUNT(r.id) AS review_count
            FROM nominations n
            LEFT JOIN panel_assignments pa ON pa.nomination_id = n.id
            LEFT JOIN panel_reviews r ON r.panel_assignment_id = pa.id
            WHERE n.cycle_id = ?
              AND n.status IN ('PANEL_REVIEW', 'HR_REVIEW', 'FINALIZED')
            GROUP BY n.id, n.nominee_id, n.status
            ORDER BY IFNULL(AVG(r.score), 0) DESC, n.created_at
            "#,
        )
        .bind(cycle_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Per-nomination panel completion for the finalization dashboard.
    pub async fn hr_summary(&self, cycle_id: Uuid) -> Result<Vec<NominationSummary>> {
        self.get_cycle(cycle_id).await?;

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT n.id AS nomination_id, n.nominee_id, n.status,
                   (SELECT AVG(r.score) FROM panel_reviews r
                     JOIN panel_assignments pa2 ON pa2.id = r.panel_assignment_id
                     WHERE pa2.nomination_id = n.id) AS average_score,
                   (SELECT COUNT(*) FROM panel_assignments pa3
                     WHERE pa3.nomination_id = n.id) AS panel_count,
                   (SELECT COUNT(*) FROM panel_assignments pa4
                     WHERE pa4.nomination_id = n.id AND pa4.status = 'COMPLETED')
                     AS completed_panels
            FROM nominations n
            WHERE n.cycle_id = ?
              AND n.status IN ('PANEL_REVIEW', 'HR_REVIEW', 'FINALIZED')
            ORDER BY n.created_at
            "#,
        )
        .bind(cycle_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn create_award_type(&self, req: CreateAwardTypeRequest) -> Result<AwardType> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO award_types (id, name, description, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(AppError::Conflict(
                    "Award type already exists".to_string(),
                ));
            }
            return Err(err.into());
        }

        Ok(AwardType {
            id,
            name: req.name,
            description: req.description,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn list_award_types(&self) -> Result<Vec<AwardType>> {
        let rows = sqlx::query_as::<_, AwardTypeRow>(
            "SELECT id, name, description, is_active, created_at FROM award_types WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AwardRow {
    id: String,
    cycle_id: String,
    nomination_id: String,
    winner_id: String,
    award_type: Option<String>,
    rank: Option<i64>,
    comment: Option<String>,
    is_active: bool,
    finalized_at: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl TryFrom<AwardRow> for Award {
    type Error = AppError;

    fn try_from(row: AwardRow) -> Result<Self> {
        Ok(Award {
            id: parse_uuid(&row.id)?,
            cycle_id: parse_uuid(&row.cycle_id)?,
            nomination_id: parse_uuid(&row.nomination_id)?,
            winner_id: parse_uuid(&row.winner_id)?,
            award_type: row.award_type,
            rank: row.rank,
            comment: row.comment,
            is_active: row.is_active,
            finalized_at: row.finalized_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AwardTypeRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<AwardTypeRow> for AwardType {
    type Error = AppError;

    fn try_from(row: AwardTypeRow) -> Result<Self> {
        Ok(AwardType {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScoredRow {
    nomination_id: String,
    nominee_id: String,
    status: String,
    average_score: Option<f64>,
    review_count: i64,
}

impl TryFrom<ScoredRow> for ScoredNomination {
    type Error = AppError;

    fn try_from(row: ScoredRow) -> Result<Self> {
        Ok(ScoredNomination {
            nomination_id: parse_uuid(&row.nomination_id)?,
            nominee_id: parse_uuid(&row.nominee_id)?,
            status: row
                .status
                .parse::<NominationStatus>()
                .map_err(AppError::Validation)?,
            average_score: row.average_score,
            review_count: row.review_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    nomination_id: String,
    nominee_id: String,
    status: String,
    average_score: Option<f64>,
    panel_count: i64,
    completed_panels: i64,
}

impl TryFrom<SummaryRow> for NominationSummary {
    type Error = AppError;

    fn try_from(row: SummaryRow) -> Result<Self> {
        let ready_for_finalization =
            row.panel_count > 0 && row.completed_panels == row.panel_count;
        Ok(NominationSummary {
            nomination_id: parse_uuid(&row.nomination_id)?,
            nominee_id: parse_uuid(&row.nominee_id)?,
            status: row
                .status
                .parse::<NominationStatus>()
                .map_err(AppError::Validation)?,
            average_score: row.average_score,
            panel_count: row.panel_count,
            completed_panels: row.completed_panels,
            ready_for_finalization,
        })
    }
}
