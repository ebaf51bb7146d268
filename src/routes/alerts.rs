use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::db::alerts;
use crate::error::{success, ApiError, ApiResult};

const ALERTS_LIMIT: i64 = 50;

/// GET /api/alerts — unhandled alerts, newest first.
pub async fn get_alerts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let alerts = alerts::unhandled(&state.db, ALERTS_LIMIT).await?;
    let count = alerts.len();

    Ok(success(json!({
        "alerts": alerts,
        "count": count,
    })))
}

/// POST /api/alerts/{alert_id}/handle — mark an alert handled.
pub async fn handle_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let updated = alerts::mark_handled(&state.db, alert_id).await?;

    if !updated {
        return Err(ApiError::not_found("NOT_FOUND", "alert does not exist"));
    }

    Ok(success(json!({
        "message": "Alert handled",
    })))
}
