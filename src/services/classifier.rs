use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::models::job::{JobStatus, JobType};

/// Default temperature thresholds (degrees C) when the job params do not
/// override them.
const WARNING_TEMPERATURE: f64 = 60.0;
const DANGER_TEMPERATURE: f64 = 80.0;

const POINTER_PROMPT: &str = r#"Read the value shown on this analog gauge.

Steps:
1. Identify the dial range (minimum to maximum scale value).
2. Identify the scale interval.
3. Locate the pointer position precisely.
4. Compute the reading (two decimal places).

Return pure JSON, no other text:
{
    "value": <reading>,
    "unit": "<unit, e.g. MPa or C>",
    "min_range": <minimum scale value>,
    "max_range": <maximum scale value>,
    "confidence": <0-1>,
    "status": "normal/warning/danger"
}

If the pointer is unclear or the dial is damaged, use a low confidence and set status to warning."#;

const SMOKE_A_PROMPT: &str = r#"Determine whether smoke is present in monitoring zone A shown in this image.

Return pure JSON, no other text:
{
    "has_smoke": true/false,
    "density": "none/light/medium/heavy",
    "confidence": <0-1>,
    "description": "<one-sentence observation>"
}"#;

const SMOKE_B_PROMPT: &str = r#"Determine whether smoke is present in monitoring zone B shown in this image.

Return pure JSON, no other text:
{
    "has_smoke": true/false,
    "density": "none/light/medium/heavy",
    "confidence": <0-1>,
    "description": "<one-sentence observation>"
}"#;

/// Structured outcome of classifying one job.
#[derive(Debug, Clone)]
pub struct Classification {
    pub result: Map<String, Value>,
    pub status: JobStatus,
    pub confidence: Option<f64>,
}

/// Client for a DashScope-compatible (OpenAI-style) vision-language model.
pub struct VisionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl VisionClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Classify one job. Numeric-threshold jobs are derived purely from
    /// params; the rest go through the vision model.
    pub async fn classify(
        &self,
        job_type: JobType,
        image: &[u8],
        params: &Map<String, Value>,
    ) -> Result<Classification, ClassifierError> {
        match job_type {
            JobType::Temperature => temperature_classification(params),
            JobType::PointerReading => {
                let mut result = self.ask_for_json(POINTER_PROMPT, image).await?;
                // The model's own qualitative judgement stands for gauges.
                let status = result
                    .get("status")
                    .and_then(Value::as_str)
                    .map(JobStatus::from_model_label)
                    .unwrap_or(JobStatus::Normal);
                let confidence = result.get("confidence").and_then(Value::as_f64);
                result.insert("status".to_string(), json!(status.as_str()));
                Ok(Classification {
                    result,
                    status,
                    confidence,
                })
            }
            JobType::SmokeA | JobType::SmokeB => {
                let prompt = if job_type == JobType::SmokeA {
                    SMOKE_A_PROMPT
                } else {
                    SMOKE_B_PROMPT
                };
                let mut result = self.ask_for_json(prompt, image).await?;
                let status = smoke_status(&result);
                let confidence = result.get("confidence").and_then(Value::as_f64);
                result.insert("status".to_string(), json!(status.as_str()));
                Ok(Classification {
                    result,
                    status,
                    confidence,
                })
            }
        }
    }

    /// Send an image plus instruction to the model and parse the answer as
    /// a JSON object, stripping an optional markdown fence first.
    async fn ask_for_json(
        &self,
        prompt: &str,
        image: &[u8],
    ) -> Result<Map<String, Value>, ClassifierError> {
        let raw = self.ask(prompt, image).await?;
        parse_json_response(&raw)
    }

    async fn ask(&self, prompt: &str, image: &[u8]) -> Result<String, ClassifierError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": image_data_uri(image)}},
                    {"type": "text", "text": prompt}
                ]
            }],
            "stream": false
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let chat: ChatResponse = response.error_for_status()?.json().await?;

        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Encode image bytes as a base64 data URI for the model request.
fn image_data_uri(image: &[u8]) -> String {
    let mime = image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg");
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    format!("data:{mime};base64,{encoded}")
}

/// Strip an optional enclosing markdown code fence (with or without a
/// `json` language tag) from a model answer.
fn strip_code_fence(text: &str) -> &str {
    let mut stripped = text.trim();
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest;
    } else if let Some(rest) = stripped.strip_prefix("```") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    stripped.trim()
}

/// Parse a model answer as a JSON object after fence stripping.
fn parse_json_response(raw: &str) -> Result<Map<String, Value>, ClassifierError> {
    let stripped = strip_code_fence(raw);
    match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ClassifierError::MalformedOutput {
            raw: raw.to_string(),
        }),
    }
}

/// Threshold-based status: danger wins over warning, both inclusive at the
/// boundary.
pub fn determine_status(value: f64, warning: f64, danger: f64) -> JobStatus {
    if value >= danger {
        JobStatus::Danger
    } else if value >= warning {
        JobStatus::Warning
    } else {
        JobStatus::Normal
    }
}

/// Map the model's smoke answer to a status: no smoke is normal, heavy
/// density is danger, any other density is warning.
pub fn smoke_status(result: &Map<String, Value>) -> JobStatus {
    if !result
        .get("has_smoke")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return JobStatus::Normal;
    }
    match result.get("density").and_then(Value::as_str) {
        Some("heavy") => JobStatus::Danger,
        _ => JobStatus::Warning,
    }
}

/// Temperature jobs carry their reading in params; no model call is made.
fn temperature_classification(
    params: &Map<String, Value>,
) -> Result<Classification, ClassifierError> {
    let max_temperature = params
        .get("max_temperature")
        .and_then(Value::as_f64)
        .ok_or(ClassifierError::MissingParam("max_temperature"))?;

    let warning = params
        .get("warning_threshold")
        .and_then(Value::as_f64)
        .unwrap_or(WARNING_TEMPERATURE);
    let danger = params
        .get("danger_threshold")
        .and_then(Value::as_f64)
        .unwrap_or(DANGER_TEMPERATURE);

    let status = determine_status(max_temperature, warning, danger);

    let mut result = Map::new();
    result.insert("max_temperature".to_string(), json!(max_temperature));
    result.insert("status".to_string(), json!(status.as_str()));
    result.insert("threshold_warning".to_string(), json!(warning));
    result.insert("threshold_danger".to_string(), json!(danger));
    for key in ["avg_temperature", "ambient_temperature"] {
        if let Some(value) = params.get(key) {
            result.insert(key.to_string(), value.clone());
        }
    }

    Ok(Classification {
        result,
        status,
        confidence: None,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned unparseable output: {raw}")]
    MalformedOutput { raw: String },

    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
}
