use clap::Parser;

use crate::provider::DEFAULT_BASE_URL;

// CLI argument structure. Key material can come from flags or from the
// environment; everything else has sane defaults.
#[derive(Parser, Debug, Clone)]
#[command(name = "weather-gateway")]
#[command(about = "Rate-limited authenticating proxy for the OpenWeather API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // OpenWeather endpoint
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    // OpenWeather API keys, comma-separated, rotated round-robin
    // Example: "ow-key-1,ow-key-2,ow-key-3"
    #[arg(long, env = "OPENWEATHER_KEYS", default_value = "", hide_env_values = true)]
    pub provider_keys: String,

    // Client API keys accepted on the X-Api-Key header (comma-separated)
    #[arg(long, env = "CLIENT_API_KEYS", default_value = "", hide_env_values = true)]
    pub client_keys: String,

    // Requests allowed per client key per hour
    #[arg(long, default_value_t = 5)]
    pub rate_limit: u32,

    // OpenWeather request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub upstream_timeout: u64,

    // How often the expired-window sweeper runs, in seconds
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,
}
