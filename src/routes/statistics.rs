use axum::extract::{Query, State};
use axum::Json;
use serde_json::Value;

use crate::app_state::AppState;
use crate::db::records;
use crate::error::{success, ApiError, ApiResult};
use crate::models::job::JobType;
use crate::models::requests::StatisticsQuery;

/// GET /api/statistics — status counts and averages over a trailing
/// window of days.
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<Value>> {
    let job_type = query
        .task_type
        .map(|code| {
            JobType::try_from(code).map_err(|_| {
                ApiError::validation(
                    "INVALID_TASK_TYPE",
                    "task_type must be an integer between 1 and 4",
                )
            })
        })
        .transpose()?;

    let stats = records::statistics(&state.db, job_type, query.days.max(1)).await?;

    Ok(success(stats))
}
