use axum::extract::State;
use axum::Json;
use base64::Engine;
use garde::Validate;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{queue, records};
use crate::error::{success, ApiError, ApiResult};
use crate::models::job::{JobStatus, JobType};
use crate::models::requests::{ProcessAccepted, ProcessRequest};
use crate::services::worker_pool::Job;

/// POST /api/process — accept one inspection job from the field device.
///
/// Validation and the queue/record handshake run synchronously so the
/// device gets an immediate answer; classification happens on the worker
/// pool afterwards. The queue deletion and the record insert are two
/// separate writes: if the insert fails the entry may already be gone and
/// the caller resubmits as a fresh job.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Json<Value>> {
    request.validate()?;

    let job_type = JobType::try_from(request.task_type).map_err(|_| {
        ApiError::validation(
            "INVALID_TASK_TYPE",
            "task_type must be an integer between 1 and 4",
        )
    })?;

    let image = base64::engine::general_purpose::STANDARD
        .decode(request.image_base64.as_bytes())
        .map_err(|e| ApiError::Decode(format!("base64 decode failed: {e}")))?;
    image::guess_format(&image)
        .map_err(|_| ApiError::Decode("unrecognized image format".to_string()))?;

    let params = parse_params(request.params)?;

    let task_id = match request.task_id {
        Some(task_id) => {
            // Best effort: ad-hoc jobs were never queued, and a racing
            // delete is fine too.
            match queue::remove(&state.db, &task_id).await {
                Ok(true) => state.notifier.spawn_queue_change("delete", task_id.clone()),
                Ok(false) => {
                    tracing::debug!(task_id = %task_id, "No queue entry for submitted task");
                }
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Queue removal failed, continuing");
                }
            }
            task_id
        }
        None => Uuid::new_v4().to_string(),
    };

    let record_id = records::create(&state.db, &task_id, job_type, request.station_id).await?;

    state.workers.submit(Job {
        record_id,
        task_id: task_id.clone(),
        job_type,
        station_id: request.station_id,
        image,
        params,
    });

    tracing::info!(
        task_id = %task_id,
        record_id,
        job_type = %job_type,
        station_id = request.station_id,
        "Job accepted for processing"
    );

    Ok(success(ProcessAccepted {
        task_id,
        record_id,
        status: JobStatus::Processing.as_str().to_string(),
    }))
}

/// Job params arrive either as a JSON object or, from the original device
/// firmware, as a JSON-encoded string.
fn parse_params(params: Option<Value>) -> Result<Map<String, Value>, ApiError> {
    match params {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ApiError::validation(
                "INVALID_JSON",
                "params must be a JSON object",
            )),
            Err(e) => Err(ApiError::validation(
                "INVALID_JSON",
                format!("params is not valid JSON: {e}"),
            )),
        },
        Some(_) => Err(ApiError::validation(
            "INVALID_JSON",
            "params must be a JSON object",
        )),
    }
}
