use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_gateway::auth::ClientKeyRegistry;
use weather_gateway::config::Args;
use weather_gateway::key_pool::KeyPool;
use weather_gateway::provider::OpenWeatherClient;
use weather_gateway::rate_limit::{self, RateLimitStore};
use weather_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Key material is validated before anything binds. A gateway with no
    // provider keys or no client allow-list must not serve traffic.
    let provider_keys =
        KeyPool::new(&args.provider_keys).context("provider key configuration")?;
    let client_keys =
        ClientKeyRegistry::new(&args.client_keys).context("client key configuration")?;
    let provider = OpenWeatherClient::new(
        args.base_url.clone(),
        Duration::from_secs(args.upstream_timeout),
    )
    .context("upstream HTTP client")?;

    // spawn the background sweeper
    let rate_limiter = RateLimitStore::new();
    tokio::spawn(rate_limit::sweep_expired_windows(
        rate_limiter.clone(),
        Duration::from_secs(args.sweep_interval),
    ));

    // creating shared state
    let state = Arc::new(AppState {
        provider: Arc::new(provider),
        client_keys,
        provider_keys,
        rate_limiter,
        rate_limit: args.rate_limit,
    });

    let app = weather_gateway::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(port = args.port, upstream = %args.base_url, "gateway listening");
    tracing::info!(
        provider_keys = state.provider_keys.len(),
        client_keys = state.client_keys.len(),
        rate_limit = state.rate_limit,
        "admission pipeline configured"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
