//! Database store for the awards workflow
//!
//! All workflow rules that touch more than one row run inside a single
//! transaction here; partial application is never observable. Uniqueness
//! that correctness depends on (one non-terminal nomination per nominee and
//! cycle, one active award per nomination, one review per assignment,
//! member, and task) is enforced by unique indexes — the pre-checks in this
//! module exist for error messages, not for safety.

mod awards;
mod cycles;
mod forms;
mod nominations;
mod panels;
mod users;

pub use awards::{NominationSummary, ScoredNomination};
pub use nominations::NominationDetail;
pub use panels::{AssignmentCoverage, MyAssignment, ReviewOutcome, TaskWithReview};

use sqlx::SqlitePool;

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// True when the underlying driver reported a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().map(|e| e.kind()),
        Some(sqlx::error::ErrorKind::UniqueViolation)
    )
}
