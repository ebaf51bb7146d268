use axum::routing::{delete, get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod alerts;
pub mod cart;
pub mod health;
pub mod history;
pub mod metrics;
pub mod process;
pub mod statistics;
pub mod tasks;

/// The API surface, without middleware layers or the metrics endpoint
/// (those are wired in `main`).
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/process", post(process::submit_job))
        .route("/api/tasks", get(tasks::get_tasks))
        .route("/api/tasks/add", post(tasks::add_task))
        .route("/api/tasks/clear", post(tasks::clear_tasks))
        .route("/api/tasks/{task_id}", delete(tasks::delete_task))
        .route("/api/history", get(history::get_history))
        .route("/api/history/latest", get(history::get_latest))
        .route("/api/statistics", get(statistics::get_statistics))
        .route(
            "/api/cart/status",
            get(cart::get_status).post(cart::update_status),
        )
        .route("/api/alerts", get(alerts::get_alerts))
        .route("/api/alerts/{alert_id}/handle", post(alerts::handle_alert))
        .with_state(state)
}
