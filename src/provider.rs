use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::UpstreamError;
use crate::models::OpenWeatherResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

// Upstream weather lookup. Admitted requests end up here with one rotated
// provider credential; implementations are shared across all requests.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(
        &self,
        city: &str,
        country: &str,
        api_key: &str,
    ) -> Result<String, UpstreamError>;
}

// reqwest-backed OpenWeather client
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(
        &self,
        city: &str,
        country: &str,
        api_key: &str,
    ) -> Result<String, UpstreamError> {
        let place = format!("{city},{country}");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", place.as_str()), ("appid", api_key)])
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        let parsed: OpenWeatherResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        // OpenWeather reports conditions as a list; the first description is
        // the one callers see. Absent or blank means the upstream payload is
        // unusable, which is an upstream failure, not a success.
        parsed
            .weather
            .into_iter()
            .next()
            .map(|condition| condition.description)
            .filter(|description| !description.trim().is_empty())
            .ok_or(UpstreamError::MissingDescription)
    }
}
