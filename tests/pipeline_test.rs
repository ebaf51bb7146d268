mod common;

use axum::routing::post;
use axum::Router;
use base64::Engine;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_test::assert_ok;
use uuid::Uuid;

use patrol_inspect::app_state::AppState;
use patrol_inspect::db::{alerts, queue, records};
use patrol_inspect::models::job::{JobStatus, JobType, Priority};
use patrol_inspect::models::record::TaskRecord;
use patrol_inspect::routes;
use patrol_inspect::services::classifier::VisionClient;
use patrol_inspect::services::notifier::Notifier;
use patrol_inspect::services::storage::ImageStore;
use patrol_inspect::services::worker_pool::{WorkerContext, WorkerPool};

use common::{sample_png, test_pool};

/// Serve a router on an ephemeral port, returning its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stub vision model: answers every chat completion with the given text
/// after an optional delay.
async fn spawn_model_stub(content: &str, delay: Duration) -> String {
    let content = content.to_string();
    let app = Router::new().route(
        "/chat/completions",
        post(move || {
            let content = content.clone();
            async move {
                sleep(delay).await;
                axum::Json(json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": content}
                    }]
                }))
            }
        }),
    );
    serve(app).await
}

/// Stub presentation service: counts result and queue-change pushes.
async fn spawn_notify_stub() -> (String, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let result_hits = Arc::new(AtomicUsize::new(0));
    let queue_hits = Arc::new(AtomicUsize::new(0));

    let results = result_hits.clone();
    let queues = queue_hits.clone();

    let app = Router::new()
        .route(
            "/api/notify/task_result",
            post(move || {
                let results = results.clone();
                async move {
                    results.fetch_add(1, Ordering::SeqCst);
                    axum::Json(json!({"status": "success"}))
                }
            }),
        )
        .route(
            "/api/notify/task_queue_update",
            post(move || {
                let queues = queues.clone();
                async move {
                    queues.fetch_add(1, Ordering::SeqCst);
                    axum::Json(json!({"status": "success"}))
                }
            }),
        );

    (serve(app).await, result_hits, queue_hits)
}

/// Real application state wired to stub endpoints.
async fn test_state(worker_count: usize, model_url: &str, notify_url: &str) -> AppState {
    let pool = test_pool().await;

    let classifier = VisionClient::new(model_url, "test-key", "qwen-vl-plus", Duration::from_secs(10))
        .expect("Failed to build vision client");
    let notifier =
        Notifier::new(notify_url, Duration::from_secs(2)).expect("Failed to build notifier");
    let images = ImageStore::new(
        std::env::temp_dir().join(format!("patrol-inspect-test-{}", Uuid::new_v4())),
    );

    let workers = WorkerPool::spawn(
        worker_count,
        WorkerContext {
            db: pool.clone(),
            classifier,
            notifier: notifier.clone(),
            images,
        },
    );

    AppState::new(pool, workers, notifier)
}

fn submit_body(task_type: i64, station_id: i64) -> Value {
    json!({
        "image_base64": base64::engine::general_purpose::STANDARD.encode(sample_png()),
        "task_type": task_type,
        "station_id": station_id,
    })
}

async fn wait_for_terminal(
    pool: &sqlx::SqlitePool,
    record_id: i64,
    timeout: Duration,
) -> TaskRecord {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(record) = records::get(pool, record_id).await.unwrap() {
            if record.status.is_terminal() {
                return record;
            }
        }
        assert!(
            Instant::now() < deadline,
            "record {record_id} did not reach a terminal state"
        );
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn submit_responds_with_processing_record_before_classification() {
    let model_url = spawn_model_stub(
        r#"{"value": 1.5, "unit": "MPa", "confidence": 0.95, "status": "normal"}"#,
        Duration::from_millis(500),
    )
    .await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(2, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&submit_body(1, 3))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["status"], "processing");
    let record_id = body["data"]["record_id"].as_i64().unwrap();
    assert!(!body["data"]["task_id"].as_str().unwrap().is_empty());

    // The model stub is still sleeping: the record must exist, in
    // processing state, right now.
    let record = records::get(&state.db, record_id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Processing);

    let done = wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;
    assert_eq!(done.status, JobStatus::Normal);
    assert_eq!(done.confidence, Some(0.95));
    assert_eq!(done.result_data.as_ref().unwrap()["value"], json!(1.5));
    assert!(done.image_path.unwrap().contains("pointer_reading"));
    assert!(done.processing_time.is_some());
}

#[tokio::test]
async fn invalid_submissions_have_no_side_effects() {
    let model_url = spawn_model_stub("{}", Duration::ZERO).await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(1, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();

    // Unsupported job type.
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&submit_body(9, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "INVALID_TASK_TYPE");

    // Well-formed base64 that is not an image.
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&json!({
            "image_base64": base64::engine::general_purpose::STANDARD.encode(b"not an image"),
            "task_type": 1,
            "station_id": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_IMAGE");

    // Unparseable params string.
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&json!({
            "image_base64": base64::engine::general_purpose::STANDARD.encode(sample_png()),
            "task_type": 2,
            "station_id": 1,
            "params": "not json",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_JSON");

    // No record was created by any of the rejected submissions.
    let all = records::query(&state.db, None, None, None, None, 50, 0)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn queued_task_is_removed_before_the_response_returns() {
    let model_url = spawn_model_stub(
        r#"{"value": 0.4, "unit": "MPa", "confidence": 0.9, "status": "normal"}"#,
        Duration::from_millis(200),
    )
    .await;
    let (notify_url, _, queue_hits) = spawn_notify_stub().await;
    let state = test_state(2, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let task_id = queue::enqueue(
        &state.db,
        3,
        JobType::PointerReading,
        None,
        Priority::Medium,
        None,
    )
    .await
    .unwrap();

    let client = reqwest::Client::new();
    let mut body = submit_body(1, 3);
    body["task_id"] = json!(task_id);

    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let response_body: Value = response.json().await.unwrap();
    assert_eq!(response_body["data"]["task_id"], json!(task_id));

    // By the time the response has returned, the queue entry is gone and
    // the record exists.
    let pending = queue::list_pending(&state.db, 10).await.unwrap();
    assert!(pending.iter().all(|entry| entry.task_id != task_id));

    let record_id = response_body["data"]["record_id"].as_i64().unwrap();
    let record = records::get(&state.db, record_id).await.unwrap().unwrap();
    assert_eq!(record.task_id, task_id);

    wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;

    // The queue-change push is fire-and-forget; give it a moment.
    let deadline = Instant::now() + Duration::from_secs(3);
    while queue_hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        sleep(Duration::from_millis(25)).await;
    }
    assert!(queue_hits.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn temperature_job_derives_warning_from_thresholds() {
    // Temperature jobs never call the model; point it at a dead stub.
    let model_url = spawn_model_stub("{}", Duration::ZERO).await;
    let (notify_url, result_hits, _) = spawn_notify_stub().await;
    let state = test_state(2, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let mut body = submit_body(2, 5);
    // Params as a JSON-encoded string, the way the device sends them.
    body["params"] =
        json!("{\"max_temperature\": 75.5, \"warning_threshold\": 60, \"danger_threshold\": 80}");

    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let response_body: Value = response.json().await.unwrap();
    let record_id = response_body["data"]["record_id"].as_i64().unwrap();

    let record = wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;
    assert_eq!(record.status, JobStatus::Warning);

    let result = record.result_data.unwrap();
    assert_eq!(result["max_temperature"], json!(75.5));
    assert_eq!(result["status"], json!("warning"));

    // A warning raises an alert and a result push.
    let unhandled = alerts::unhandled(&state.db, 10).await.unwrap();
    assert_eq!(unhandled.len(), 1);
    assert_eq!(unhandled[0].alert_level, "warning");

    let deadline = Instant::now() + Duration::from_secs(3);
    while result_hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        sleep(Duration::from_millis(25)).await;
    }
    assert!(result_hits.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn fenced_smoke_answer_lands_danger_with_alert() {
    let model_url = spawn_model_stub(
        "```json\n{\"has_smoke\": true, \"density\": \"heavy\", \"confidence\": 0.88}\n```",
        Duration::ZERO,
    )
    .await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(2, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&submit_body(3, 4))
        .send()
        .await
        .unwrap();
    let response_body: Value = response.json().await.unwrap();
    let record_id = response_body["data"]["record_id"].as_i64().unwrap();

    let record = wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;
    assert_eq!(record.status, JobStatus::Danger);
    assert_eq!(record.confidence, Some(0.88));

    let result = record.result_data.unwrap();
    assert_eq!(result["has_smoke"], json!(true));
    assert_eq!(result["status"], json!("danger"));

    let unhandled = alerts::unhandled(&state.db, 10).await.unwrap();
    assert_eq!(unhandled.len(), 1);
    assert_eq!(unhandled[0].alert_level, "danger");
    assert_eq!(unhandled[0].alert_type, "smoke_a");
}

#[tokio::test]
async fn unparseable_model_answer_fails_the_job() {
    let model_url =
        spawn_model_stub("The gauge appears to read about 1.5 MPa.", Duration::ZERO).await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(1, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&submit_body(1, 2))
        .send()
        .await
        .unwrap();
    // Classification failures are asynchronous: the submission succeeds.
    assert!(response.status().is_success());
    let response_body: Value = response.json().await.unwrap();
    let record_id = response_body["data"]["record_id"].as_i64().unwrap();

    let record = wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;
    assert_eq!(record.status, JobStatus::Failed);

    let error = record.result_data.unwrap()["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(error.contains("unparseable"));
}

#[tokio::test]
async fn fifteen_concurrent_jobs_drain_through_ten_workers() {
    let model_url = spawn_model_stub(
        r#"{"has_smoke": false, "density": "none", "confidence": 0.97}"#,
        Duration::from_millis(100),
    )
    .await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(10, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let submissions = (0..15).map(|i| {
        let client = client.clone();
        let url = format!("{base_url}/api/process");
        async move {
            client
                .post(url)
                .json(&submit_body(4, i + 1))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    });

    let record_ids: Vec<i64> = join_all(submissions)
        .await
        .into_iter()
        .map(|body| {
            assert_eq!(body["status"], "success");
            body["data"]["record_id"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(record_ids.len(), 15);

    for record_id in record_ids {
        let record = wait_for_terminal(&state.db, record_id, Duration::from_secs(15)).await;
        assert_eq!(record.status, JobStatus::Normal);
    }
}

#[tokio::test]
async fn dead_notification_channel_degrades_to_polling_only() {
    let model_url = spawn_model_stub("{}", Duration::ZERO).await;
    // Nothing listens here; every push times out or is refused.
    let state = test_state(1, &model_url, "http://127.0.0.1:9").await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();
    let mut body = submit_body(2, 1);
    body["params"] = json!({"max_temperature": 95.0});

    let response = client
        .post(format!("{base_url}/api/process"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let response_body: Value = response.json().await.unwrap();
    let record_id = response_body["data"]["record_id"].as_i64().unwrap();

    // The job still completes; the result is observable by polling.
    let record = wait_for_terminal(&state.db, record_id, Duration::from_secs(5)).await;
    assert_eq!(record.status, JobStatus::Danger);
}

#[tokio::test]
async fn queue_api_round_trip_with_priorities() {
    let model_url = spawn_model_stub("{}", Duration::ZERO).await;
    let (notify_url, _, queue_hits) = spawn_notify_stub().await;
    let state = test_state(1, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state.clone())).await;

    let client = reqwest::Client::new();

    let add = |station_id: i64, priority: &'static str| {
        let client = client.clone();
        let url = format!("{base_url}/api/tasks/add");
        async move {
            let body: Value = client
                .post(url)
                .json(&json!({
                    "station_id": station_id,
                    "task_type": 1,
                    "priority": priority,
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(body["status"], "success");
            body["data"]["task_id"].as_str().unwrap().to_string()
        }
    };

    let low = add(1, "low").await;
    let high = add(2, "high").await;

    let listing: Value = client
        .get(format!("{base_url}/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"]["count"], json!(2));
    assert_eq!(listing["data"]["tasks"][0]["task_id"], json!(high));
    assert_eq!(listing["data"]["tasks"][0]["task_type"], json!(1));
    assert_eq!(listing["data"]["tasks"][1]["task_id"], json!(low));

    // Deleting an unknown task is a 404; deleting a real one works once.
    let missing = client
        .delete(format!("{base_url}/api/tasks/no-such-task"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    let missing_body: Value = missing.json().await.unwrap();
    assert_eq!(missing_body["error"]["code"], "TASK_NOT_FOUND");

    let deleted = client
        .delete(format!("{base_url}/api/tasks/{high}"))
        .send()
        .await
        .unwrap();
    assert!(deleted.status().is_success());

    let listing: Value = client
        .get(format!("{base_url}/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"]["count"], json!(1));

    // Two adds and one delete each pushed a queue-change notification.
    let deadline = Instant::now() + Duration::from_secs(3);
    while queue_hits.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(queue_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn health_reports_available_job_types() {
    let model_url = spawn_model_stub("{}", Duration::ZERO).await;
    let (notify_url, _, _) = spawn_notify_stub().await;
    let state = test_state(1, &model_url, &notify_url).await;
    let base_url = serve(routes::api_router(state)).await;

    let body = tokio_test::assert_ok!(
        reqwest::get(format!("{base_url}/health")).await
    );
    let health: Value = body.json().await.unwrap();

    assert_eq!(health["status"], "healthy");
    let job_types: Vec<i64> = health["available_job_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|info| info["code"].as_i64().unwrap())
        .collect();
    assert_eq!(job_types, vec![1, 2, 3, 4]);
}
