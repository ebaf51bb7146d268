use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::db::records;
use crate::error::{success, ApiError, ApiResult};
use crate::models::job::JobType;
use crate::models::requests::{HistoryQuery, LatestQuery};

fn parse_job_type_filter(task_type: Option<i64>) -> Result<Option<JobType>, ApiError> {
    task_type
        .map(|code| {
            JobType::try_from(code).map_err(|_| {
                ApiError::validation(
                    "INVALID_TASK_TYPE",
                    "task_type must be an integer between 1 and 4",
                )
            })
        })
        .transpose()
}

/// GET /api/history — result records, most recent first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let job_type = parse_job_type_filter(query.task_type)?;
    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let records = records::query(
        &state.db,
        job_type,
        query.station_id,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        limit,
        offset,
    )
    .await?;

    let count = records.len();
    tracing::info!(count, "Returning history records");

    Ok(success(json!({
        "records": records,
        "count": count,
        "limit": limit,
        "offset": offset,
    })))
}

/// GET /api/history/latest — the latest record for a station, optionally
/// narrowed to one job type.
pub async fn get_latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> ApiResult<Json<Value>> {
    let job_type = parse_job_type_filter(query.task_type)?;

    let record = records::latest_for(&state.db, query.station_id, job_type)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("NOT_FOUND", "no records for this station")
        })?;

    Ok(success(record))
}
