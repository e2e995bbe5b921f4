use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthRejection;

// Startup configuration problems. Any of these is fatal: the gateway
// refuses to serve without key material.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no OpenWeather API keys configured (set --provider-keys or OPENWEATHER_KEYS)")]
    NoProviderKeys,

    #[error("no client API keys configured (set --client-keys or CLIENT_API_KEYS)")]
    NoClientKeys,
}

// Failures talking to OpenWeather. Every variant surfaces to the caller as
// 502 with the display string in the `details` field.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Upstream error {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Weather description not found in OpenWeather response.")]
    MissingDescription,

    #[error("Error calling OpenWeather: {0}")]
    Transport(String),
}

// Request-level failures, ordered the way the admission pipeline checks them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing city or country parameter")]
    MissingParams,

    #[error("missing API key")]
    MissingApiKey,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("hourly rate limit exceeded")]
    QuotaExceeded {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after_secs: i64,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::MissingKey => ApiError::MissingApiKey,
            AuthRejection::InvalidKey => ApiError::InvalidApiKey,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingParams => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Both 'city' and 'country' query parameters are required."
                })),
            )
                .into_response(),
            ApiError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Missing API key. Please provide an 'X-Api-Key' header."
                })),
            )
                .into_response(),
            ApiError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid API key." })),
            )
                .into_response(),
            ApiError::QuotaExceeded {
                limit,
                reset_at,
                retry_after_secs,
            } => {
                let body = Json(json!({
                    "error": "Hourly rate limit exceeded",
                    "message": format!("This API key is limited to {limit} calls per hour."),
                    "limit": limit,
                    "remaining": 0,
                    "resetUtc": reset_at.to_rfc3339(),
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::Upstream(err) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Failed to retrieve weather from upstream provider.",
                    "details": err.to_string(),
                })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                // Full detail stays in the log, never in the body.
                tracing::error!(%detail, "unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An unexpected error occurred." })),
                )
                    .into_response()
            }
        }
    }
}
