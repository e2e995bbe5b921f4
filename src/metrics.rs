use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of weather requests").unwrap();
    pub static ref AUTH_REJECTED: Counter =
        register_counter!("gateway_auth_rejected_total", "Requests with a missing or invalid API key").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("gateway_rate_limited_total", "Requests rejected by the hourly quota").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("gateway_upstream_errors_total", "Failed OpenWeather calls").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "gateway_upstream_latency_seconds",
        "OpenWeather call latency in seconds"
    )
    .unwrap();
    pub static ref ACTIVE_WINDOWS: Gauge =
        register_gauge!("gateway_rate_limit_windows", "Current number of live rate limit windows").unwrap();
}
