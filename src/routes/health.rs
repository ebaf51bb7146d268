use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::app_state::AppState;
use crate::error::envelope_timestamp;
use crate::models::job::JobType;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub available_job_types: Vec<JobTypeInfo>,
    pub checks: HealthChecks,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct JobTypeInfo {
    pub code: i64,
    pub name: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// GET /health — service status plus the supported job types.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();

    let db_check = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ComponentHealth {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(_) => ComponentHealth {
            status: "error".to_string(),
            latency_ms: None,
        },
    };

    let healthy = db_check.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: "patrol-inspect".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        available_job_types: JobType::iter()
            .map(|job_type| JobTypeInfo {
                code: job_type.code(),
                name: job_type.to_string(),
                description: job_type.description().to_string(),
            })
            .collect(),
        checks: HealthChecks { database: db_check },
        timestamp: envelope_timestamp(),
    };

    (status_code, Json(response))
}
