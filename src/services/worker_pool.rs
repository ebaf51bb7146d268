use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

use crate::db::{alerts, records};
use crate::models::job::{JobStatus, JobType};
use crate::models::record::RecordUpdate;
use crate::services::classifier::{Classification, ClassifierError, VisionClient};
use crate::services::notifier::Notifier;
use crate::services::storage::{ImageStore, StorageError};

/// One unit of work handed from the dispatcher to the pool. The worker
/// that receives it is the sole writer of the owning record.
pub struct Job {
    pub record_id: i64,
    pub task_id: String,
    pub job_type: JobType,
    pub station_id: i64,
    pub image: Vec<u8>,
    pub params: Map<String, Value>,
}

/// Dependencies shared by all workers.
pub struct WorkerContext {
    pub db: SqlitePool,
    pub classifier: VisionClient,
    pub notifier: Notifier,
    pub images: ImageStore,
}

/// Fixed-size pool of concurrent workers draining an unbounded channel.
#[derive(Clone)]
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicI64>,
}

impl WorkerPool {
    /// Start `worker_count` workers sharing one receiver.
    pub fn spawn(worker_count: usize, ctx: WorkerContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let ctx = Arc::new(ctx);
        let depth = Arc::new(AtomicI64::new(0));

        for worker_id in 0..worker_count {
            let rx = Arc::clone(&rx);
            let ctx = Arc::clone(&ctx);
            let depth = Arc::clone(&depth);

            tokio::spawn(async move {
                loop {
                    // Lock held only while waiting for the next job.
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };

                    let pending = depth.fetch_sub(1, Ordering::Relaxed) - 1;
                    metrics::gauge!("inspection_queue_depth").set(pending as f64);

                    process_job(worker_id, &ctx, job).await;
                }
                tracing::debug!(worker_id, "Worker stopped");
            });
        }

        Self { tx, depth }
    }

    /// Hand a job to the pool. Never blocks and never rejects; if all
    /// workers are busy the job waits in the internal channel.
    pub fn submit(&self, job: Job) {
        metrics::counter!("inspection_jobs_total").increment(1);
        let pending = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("inspection_queue_depth").set(pending as f64);

        if self.tx.send(job).is_err() {
            tracing::error!("Worker channel closed, job dropped");
        }
    }
}

async fn process_job(worker_id: usize, ctx: &WorkerContext, job: Job) {
    let started = Instant::now();

    tracing::info!(
        worker_id,
        record_id = job.record_id,
        task_id = %job.task_id,
        job_type = %job.job_type,
        station_id = job.station_id,
        "Processing inspection job"
    );

    match run_job(ctx, &job).await {
        Ok((classification, image_path)) => {
            let elapsed = round2(started.elapsed().as_secs_f64());
            complete_job(ctx, &job, classification, image_path, elapsed).await;
        }
        Err(e) => {
            let elapsed = round2(started.elapsed().as_secs_f64());
            tracing::error!(record_id = job.record_id, error = %e, "Job processing failed");
            metrics::counter!("inspection_jobs_failed").increment(1);
            record_failure(ctx, &job, &e.to_string(), elapsed).await;
        }
    }
}

/// The fallible part of a job: persist the image, classify it.
async fn run_job(
    ctx: &WorkerContext,
    job: &Job,
) -> Result<(Classification, String), WorkerError> {
    let image_path = ctx
        .images
        .save(&job.image, job.job_type, job.station_id)
        .await?;

    let classification = ctx
        .classifier
        .classify(job.job_type, &job.image, &job.params)
        .await?;

    Ok((classification, image_path))
}

async fn complete_job(
    ctx: &WorkerContext,
    job: &Job,
    classification: Classification,
    image_path: String,
    elapsed: f64,
) {
    let Classification {
        result,
        status,
        confidence,
    } = classification;

    let update = RecordUpdate {
        result_data: Some(Value::Object(result.clone())),
        image_path: Some(image_path.clone()),
        status: Some(status),
        confidence,
        processing_time: Some(elapsed),
    };

    match records::update(&ctx.db, job.record_id, &update).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                record_id = job.record_id,
                "Lost update: record no longer exists"
            );
            return;
        }
        Err(e) => {
            tracing::error!(record_id = job.record_id, error = %e, "Failed to store job result");
            metrics::counter!("inspection_jobs_failed").increment(1);
            record_failure(ctx, job, &format!("result write failed: {e}"), elapsed).await;
            return;
        }
    }

    metrics::counter!("inspection_jobs_completed").increment(1);
    metrics::histogram!("inspection_processing_seconds").record(elapsed);

    tracing::info!(
        record_id = job.record_id,
        status = %status,
        elapsed,
        "Job completed"
    );

    if matches!(status, JobStatus::Warning | JobStatus::Danger) {
        let message = format!(
            "{} at station {} reported {}",
            job.job_type.description(),
            job.station_id,
            status
        );
        if let Err(e) = alerts::add(
            &ctx.db,
            Some(job.record_id),
            status.as_str(),
            &job.job_type.to_string(),
            &message,
        )
        .await
        {
            tracing::warn!(record_id = job.record_id, error = %e, "Failed to log alert");
        }
    }

    ctx.notifier.spawn_result(json!({
        "job_type": job.job_type.code(),
        "station_id": job.station_id,
        "result": Value::Object(result),
        "image_path": image_path,
        "timestamp": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }));
}

/// Best effort: a second failure here is swallowed, leaving the record in
/// `processing`.
async fn record_failure(ctx: &WorkerContext, job: &Job, error: &str, elapsed: f64) {
    let update = RecordUpdate {
        result_data: Some(json!({ "error": error })),
        status: Some(JobStatus::Failed),
        processing_time: Some(elapsed),
        ..Default::default()
    };

    match records::update(&ctx.db, job.record_id, &update).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                record_id = job.record_id,
                "Lost update: record no longer exists"
            );
        }
        Err(e) => {
            tracing::error!(record_id = job.record_id, error = %e, "Failed to record job failure");
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, thiserror::Error)]
enum WorkerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}
