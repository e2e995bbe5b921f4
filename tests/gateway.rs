use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use httpmock::prelude::*;
use serde_json::Value;

use weather_gateway::auth::ClientKeyRegistry;
use weather_gateway::error::UpstreamError;
use weather_gateway::key_pool::KeyPool;
use weather_gateway::provider::{OpenWeatherClient, WeatherProvider};
use weather_gateway::rate_limit::RateLimitStore;
use weather_gateway::state::AppState;

// Canned provider so pipeline tests never leave the process.
struct StubProvider {
    reply: Result<String, UpstreamError>,
}

impl StubProvider {
    fn ok(description: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(description.to_string()),
        })
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch(
        &self,
        _city: &str,
        _country: &str,
        _api_key: &str,
    ) -> Result<String, UpstreamError> {
        self.reply.clone()
    }
}

// Serve the gateway on an ephemeral loopback port.
async fn spawn_gateway(
    provider: Arc<dyn WeatherProvider>,
    client_keys: &str,
    provider_keys: &str,
    rate_limit: u32,
) -> SocketAddr {
    let state = Arc::new(AppState {
        provider,
        client_keys: ClientKeyRegistry::new(client_keys).expect("client keys"),
        provider_keys: KeyPool::new(provider_keys).expect("provider keys"),
        rate_limiter: RateLimitStore::new(),
        rate_limit,
    });

    let app = weather_gateway::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    addr
}

fn weather_url(addr: SocketAddr) -> String {
    format!("http://{addr}/api/weather?city=Sydney&country=au")
}

#[tokio::test]
async fn serves_weather_until_the_hourly_quota_runs_out() {
    let addr = spawn_gateway(StubProvider::ok("clear sky"), "test-key", "ow-key-1", 5).await;
    let client = reqwest::Client::new();

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = client
            .get(weather_url(addr))
            .header("X-Api-Key", "test-key")
            .send()
            .await
            .expect("request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-ratelimit-limit")
                .and_then(|v| v.to_str().ok()),
            Some("5")
        );
        assert_eq!(
            response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok()),
            Some(expected_remaining)
        );

        let reset = response
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .expect("reset header");
        chrono::DateTime::parse_from_rfc3339(reset).expect("reset header parses");

        let body: Value = response.json().await.expect("json body");
        assert_eq!(body["description"], "clear sky");
    }

    // Sixth request in the same hour is rejected.
    let response = client
        .get(weather_url(addr))
        .header("X-Api-Key", "test-key")
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: i64 = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .expect("retry-after header")
        .parse()
        .expect("retry-after is numeric");
    assert!(retry_after > 0);

    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Hourly rate limit exceeded");
    assert_eq!(body["limit"], 5);
    assert_eq!(body["remaining"], 0);
    assert_eq!(
        body["message"],
        "This API key is limited to 5 calls per hour."
    );
    assert!(body["resetUtc"].is_string());
}

#[tokio::test]
async fn missing_and_invalid_keys_get_distinct_unauthorized_bodies() {
    let addr = spawn_gateway(StubProvider::ok("clear sky"), "test-key", "ow-key-1", 5).await;
    let client = reqwest::Client::new();

    let response = client
        .get(weather_url(addr))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(
        body["error"],
        "Missing API key. Please provide an 'X-Api-Key' header."
    );

    let response = client
        .get(weather_url(addr))
        .header("X-Api-Key", "wrong-key")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Invalid API key.");
}

#[tokio::test]
async fn blank_params_fail_before_authentication() {
    let addr = spawn_gateway(StubProvider::ok("clear sky"), "test-key", "ow-key-1", 5).await;
    let client = reqwest::Client::new();

    // No API key on purpose. The 400 proves parameters are checked first.
    let response = client
        .get(format!("http://{addr}/api/weather?city=&country=au"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(
        body["error"],
        "Both 'city' and 'country' query parameters are required."
    );
}

#[tokio::test]
async fn exhausted_key_does_not_affect_other_clients() {
    let addr = spawn_gateway(
        StubProvider::ok("clear sky"),
        "alpha-key,beta-key",
        "ow-key-1",
        2,
    )
    .await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client
            .get(weather_url(addr))
            .header("X-Api-Key", "alpha-key")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = client
        .get(weather_url(addr))
        .header("X-Api-Key", "alpha-key")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = client
        .get(weather_url(addr))
        .header("X-Api-Key", "beta-key")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upstream_failure_surfaces_as_bad_gateway_with_quota_headers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/weather");
            then.status(400).body("Invalid request");
        })
        .await;

    let upstream = OpenWeatherClient::new(server.url("/weather"), Duration::from_secs(2))
        .expect("client builds");
    let addr = spawn_gateway(Arc::new(upstream), "test-key", "ow-key-1", 5).await;

    let response = reqwest::Client::new()
        .get(weather_url(addr))
        .header("X-Api-Key", "test-key")
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // The request was admitted, so it still spends quota and carries the
    // quota headers.
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok()),
        Some("4")
    );

    let body: Value = response.json().await.expect("json body");
    assert_eq!(
        body["error"],
        "Failed to retrieve weather from upstream provider."
    );
    let details = body["details"].as_str().expect("details string");
    assert!(details.contains("400"));
    assert!(details.contains("Invalid request"));
}

#[tokio::test]
async fn provider_keys_rotate_across_requests() {
    let server = MockServer::start_async().await;

    let key_a = server
        .mock_async(|when, then| {
            when.method(GET).path("/weather").query_param("appid", "ow-key-a");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"weather":[{"description":"clear sky"}]}"#);
        })
        .await;
    let key_b = server
        .mock_async(|when, then| {
            when.method(GET).path("/weather").query_param("appid", "ow-key-b");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"weather":[{"description":"clear sky"}]}"#);
        })
        .await;

    let upstream = OpenWeatherClient::new(server.url("/weather"), Duration::from_secs(2))
        .expect("client builds");
    let addr = spawn_gateway(Arc::new(upstream), "test-key", "ow-key-a,ow-key-b", 10).await;
    let client = reqwest::Client::new();

    for _ in 0..4 {
        let response = client
            .get(weather_url(addr))
            .header("X-Api-Key", "test-key")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    key_a.assert_calls_async(2).await;
    key_b.assert_calls_async(2).await;
}

#[tokio::test]
async fn trimmed_params_reach_the_upstream_query() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/weather")
                .query_param("q", "Sydney,au")
                .query_param("appid", "ow-key-1");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"weather":[{"description":"clear sky"}]}"#);
        })
        .await;

    let upstream = OpenWeatherClient::new(server.url("/weather"), Duration::from_secs(2))
        .expect("client builds");
    let addr = spawn_gateway(Arc::new(upstream), "test-key", "ow-key-1", 5).await;

    let response = reqwest::Client::new()
        .get(format!(
            "http://{addr}/api/weather?city=%20Sydney%20&country=%20au%20"
        ))
        .header("X-Api-Key", "test-key")
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn health_and_metrics_bypass_admission() {
    let addr = spawn_gateway(StubProvider::ok("clear sky"), "test-key", "ow-key-1", 5).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["status"], "healthy");

    // Touch the pipeline once so the counters exist, then scrape.
    let _ = client
        .get(weather_url(addr))
        .header("X-Api-Key", "test-key")
        .send()
        .await
        .expect("request");

    let response = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.expect("text body");
    assert!(text.contains("gateway_requests_total"));
}
