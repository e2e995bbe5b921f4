use axum::{Json, response::IntoResponse};

// Health handler. Stays outside the admission pipeline so probes never
// burn quota.
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
