use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{JobStatus, JobType};

/// A persisted job outcome.
///
/// Created in `Processing` state by the dispatcher before the worker pool
/// sees the job, then written exactly once more by the worker that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub task_id: String,
    pub job_type: JobType,
    pub station_id: i64,
    pub image_path: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub status: JobStatus,
    pub confidence: Option<f64>,
    pub processing_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Fields a worker writes when a job reaches a terminal state. All fields
/// are optional; only the provided ones are written.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub result_data: Option<serde_json::Value>,
    pub image_path: Option<String>,
    pub status: Option<JobStatus>,
    pub confidence: Option<f64>,
    pub processing_time: Option<f64>,
}

/// Aggregate counts over a trailing window, for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_count: i64,
    pub normal_count: i64,
    pub warning_count: i64,
    pub danger_count: i64,
    pub failed_count: i64,
    pub avg_confidence: Option<f64>,
    pub avg_processing_time: Option<f64>,
}
