use axum::extract::{Path, Query, State};
use axum::Json;
use garde::Validate;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::db::queue;
use crate::error::{success, ApiError, ApiResult};
use crate::models::job::JobType;
use crate::models::requests::{AddTaskRequest, ClearTasksRequest};

const PENDING_LIMIT: i64 = 50;

/// GET /api/tasks — pending jobs for the field device, priority tiers
/// first, FIFO within a tier.
pub async fn get_tasks(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tasks = queue::list_pending(&state.db, PENDING_LIMIT).await?;
    let count = tasks.len();

    tracing::info!(count, "Returning pending tasks");

    Ok(success(json!({
        "tasks": tasks,
        "count": count,
    })))
}

/// POST /api/tasks/add — queue a new job.
pub async fn add_task(
    State(state): State<AppState>,
    Json(request): Json<AddTaskRequest>,
) -> ApiResult<Json<Value>> {
    request.validate()?;

    let job_type = JobType::try_from(request.task_type).map_err(|_| {
        ApiError::validation(
            "INVALID_TASK_TYPE",
            "task_type must be an integer between 1 and 4",
        )
    })?;

    let task_id = queue::enqueue(
        &state.db,
        request.station_id,
        job_type,
        request.params.as_ref(),
        request.priority.unwrap_or_default(),
        None,
    )
    .await?;

    state.notifier.spawn_queue_change("add", task_id.clone());

    Ok(success(json!({
        "task_id": task_id,
        "message": "Task added",
    })))
}

/// DELETE /api/tasks/{task_id} — remove a pending job.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = queue::remove(&state.db, &task_id).await?;

    if !removed {
        return Err(ApiError::not_found("TASK_NOT_FOUND", "task does not exist"));
    }

    state.notifier.spawn_queue_change("delete", task_id);

    Ok(success(json!({
        "message": "Task deleted",
    })))
}

/// POST /api/tasks/clear — purge stale queue entries.
pub async fn clear_tasks(
    State(state): State<AppState>,
    Query(request): Query<ClearTasksRequest>,
) -> ApiResult<Json<Value>> {
    let cleared = queue::purge_stale(&state.db, request.days.max(1)).await?;

    Ok(success(json!({
        "cleared_count": cleared,
        "message": format!("Purged {cleared} stale tasks"),
    })))
}
