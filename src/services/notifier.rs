use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Best-effort HTTP notifications to the presentation service.
///
/// The dashboard polls the stores on its own; these pushes only cut the
/// latency of a live update. Every outcome is logged and every error is
/// swallowed — a dead notification channel must never fail a job.
#[derive(Clone)]
pub struct Notifier {
    http: Client,
    base_url: String,
}

impl Notifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Push a finished job result to the presentation service.
    pub async fn notify_result(&self, payload: serde_json::Value) {
        self.post("/api/notify/task_result", payload).await;
    }

    /// Push a queue change (`add` or `delete`) to the presentation service.
    pub async fn notify_queue_change(&self, action: &str, task_id: &str) {
        let payload = json!({
            "action": action,
            "task_id": task_id,
        });
        self.post("/api/notify/task_queue_update", payload).await;
    }

    /// Fire-and-forget variant of [`notify_result`](Self::notify_result).
    pub fn spawn_result(&self, payload: serde_json::Value) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify_result(payload).await;
        });
    }

    /// Fire-and-forget variant of
    /// [`notify_queue_change`](Self::notify_queue_change).
    pub fn spawn_queue_change(&self, action: &'static str, task_id: String) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify_queue_change(action, &task_id).await;
        });
    }

    async fn post(&self, path: &str, payload: serde_json::Value) {
        let url = format!("{}{}", self.base_url, path);
        match self.http.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(path, "Notification delivered");
            }
            Ok(response) => {
                tracing::warn!(path, status = %response.status(), "Notification rejected");
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Notification failed");
            }
        }
    }
}
