use sqlx::SqlitePool;

use crate::services::{notifier::Notifier, worker_pool::WorkerPool};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub workers: WorkerPool,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: SqlitePool, workers: WorkerPool, notifier: Notifier) -> Self {
        Self {
            db,
            workers,
            notifier,
        }
    }
}
