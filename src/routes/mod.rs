//! HTTP surface
//!
//! Handlers are thin: authenticate, gate on role, call into the store, wrap
//! the result in the response envelope. All domain rules live in the store.

mod awards;
mod cycles;
mod forms;
mod nominations;
mod panels;
mod users;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::sync::Arc;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(users::create).get(users::list))
        .route("/award-types", post(awards::create_type).get(awards::list_types))
        .route("/cycles", post(cycles::create).get(cycles::list))
        .route("/cycles/:id", get(cycles::show).patch(cycles::update))
        .route("/cycles/:id/finalize", post(awards::finalize_cycle))
        .route(
            "/cycles/:id/nominations",
            delete(nominations::delete_for_cycle),
        )
        .route("/cycles/:id/results", get(awards::results))
        .route("/cycles/:id/summary", get(awards::summary))
        .route("/forms", post(forms::create).get(forms::list))
        .route("/forms/:id", get(forms::show).put(forms::update))
        .route(
            "/nominations",
            post(nominations::create).get(nominations::list),
        )
        .route(
            "/nominations/:id",
            get(nominations::show).delete(nominations::delete),
        )
        .route("/nominations/:id/status", patch(nominations::update_status))
        .route("/nominations/:id/panels", post(panels::assign))
        .route("/panels", post(panels::create).get(panels::list))
        .route("/panels/:id", get(panels::show))
        .route(
            "/panels/:id/members",
            post(panels::add_member).get(panels::list_members),
        )
        .route(
            "/panels/:id/tasks",
            post(panels::add_task).get(panels::list_tasks),
        )
        .route("/assignments", get(panels::all_assignments))
        .route("/assignments/my", get(panels::my_assignments))
        .route(
            "/assignments/:id/tasks/:task_id/review",
            put(panels::submit_review),
        )
        .route("/awards", post(awards::create).get(awards::list))
        .route("/awards/:id", get(awards::show).patch(awards::update))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
