//! Kudos server - employee awards nomination and review workflow

pub mod error;
pub mod extract;
pub mod identity;
pub mod models;
pub mod response;
pub mod routes;
pub mod store;

use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            store: store::Store::new(pool),
        })
    }
}
