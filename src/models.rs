use serde::{Deserialize, Serialize};

// Query parameters for /api/weather. Both are required, but presence is
// checked in the handler so the 400 body keeps its documented shape.
#[derive(Deserialize, Debug)]
pub struct WeatherQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

// Gateway response format
#[derive(Deserialize, Serialize, Debug)]
pub struct WeatherReply {
    pub description: String,
}

// OpenWeather response format (only the part the gateway reads)
#[derive(Deserialize, Debug)]
pub struct OpenWeatherResponse {
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Deserialize, Debug)]
pub struct WeatherCondition {
    #[serde(default)]
    pub description: String,
}
