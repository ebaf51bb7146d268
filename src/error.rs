use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

/// Timestamp format used across the JSON envelope, matching what the
/// dashboard expects.
pub fn envelope_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Wrap response data in the uniform success envelope.
pub fn success<T: Serialize>(data: T) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "success",
        "data": data,
        "timestamp": envelope_timestamp(),
    }))
}

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce the uniform
/// `{status, error: {code, message}, timestamp}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input caught before any side effect (unsupported job type,
    /// malformed params, missing field).
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    /// The uploaded image could not be decoded.
    #[error("invalid image: {0}")]
    Decode(String),

    /// A store write or read failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced resource does not exist.
    #[error("{message}")]
    NotFound {
        code: &'static str,
        message: String,
    },
}

/// Convenience alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::validation("VALIDATION_ERROR", report.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.clone())
            }
            ApiError::Decode(msg) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE", msg.clone()),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_FAILED",
                    "Database operation failed".to_string(),
                )
            }
            ApiError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, *code, message.clone())
            }
        };

        let body = json!({
            "status": "error",
            "error": {
                "code": code,
                "message": message,
            },
            "timestamp": envelope_timestamp(),
        });

        (status, axum::Json(body)).into_response()
    }
}
