use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::auth::{self, API_KEY_HEADER, AuthRejection};
use crate::error::ApiError;
use crate::metrics::{
    AUTH_REJECTED, RATE_LIMITED, REQUEST_TOTAL, UPSTREAM_ERRORS, UPSTREAM_LATENCY,
};
use crate::models::{WeatherQuery, WeatherReply};
use crate::rate_limit::RateDecision;
use crate::state::AppState;

// Pull trimmed city/country out of the query. Blank counts the same as absent.
fn required_params(params: &WeatherQuery) -> Result<(&str, &str), ApiError> {
    let city = params.city.as_deref().map(str::trim).unwrap_or_default();
    let country = params.country.as_deref().map(str::trim).unwrap_or_default();

    if city.is_empty() || country.is_empty() {
        return Err(ApiError::MissingParams);
    }

    Ok((city, country))
}

// Quota headers go on every response that made it past admission, the
// upstream-failure one included.
fn apply_rate_limit_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at.to_rfc3339()) {
        headers.insert("x-ratelimit-reset", value);
    }
}

// Admission pipeline for /api/weather. Order matters: parameters first,
// then the client key, then the quota. Only admitted requests touch the
// provider key rotation or the upstream.
pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherQuery>,
    headers: HeaderMap,
) -> Response {
    REQUEST_TOTAL.inc();

    let (city, country) = match required_params(&params) {
        Ok(pair) => pair,
        Err(err) => return err.into_response(),
    };

    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let client_key = match state.client_keys.validate(presented) {
        Ok(key) => key,
        Err(rejection) => {
            AUTH_REJECTED.inc();
            match rejection {
                AuthRejection::MissingKey => {
                    tracing::info!("rejected request with no API key");
                }
                AuthRejection::InvalidKey => {
                    // Unknown keys are logged as fingerprints, never raw.
                    tracing::info!(
                        client = %auth::fingerprint(presented.unwrap_or_default()),
                        "rejected request with unknown API key"
                    );
                }
            }
            return ApiError::from(rejection).into_response();
        }
    };

    let decision = state.rate_limiter.try_consume(client_key, state.rate_limit);
    if !decision.allowed {
        RATE_LIMITED.inc();
        tracing::warn!(
            client = %auth::fingerprint(client_key),
            reset_at = %decision.reset_at,
            "hourly rate limit exceeded"
        );
        let retry_after_secs = (decision.reset_at - Utc::now()).num_seconds().max(0);
        return ApiError::QuotaExceeded {
            limit: decision.limit,
            reset_at: decision.reset_at,
            retry_after_secs,
        }
        .into_response();
    }

    tracing::debug!(
        client = %auth::fingerprint(client_key),
        remaining = decision.remaining,
        %city,
        %country,
        "request admitted"
    );

    let api_key = state.provider_keys.next_key();
    let start_time = Instant::now();
    let outcome = state.provider.fetch(city, country, api_key).await;
    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let mut response = match outcome {
        Ok(description) => Json(WeatherReply { description }).into_response(),
        Err(err) => {
            UPSTREAM_ERRORS.inc();
            tracing::warn!(%city, %country, error = %err, "upstream fetch failed");
            ApiError::Upstream(err).into_response()
        }
    };

    apply_rate_limit_headers(&mut response, &decision);
    response
}
