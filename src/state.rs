use std::sync::Arc;

use crate::auth::ClientKeyRegistry;
use crate::key_pool::KeyPool;
use crate::provider::WeatherProvider;
use crate::rate_limit::RateLimitStore;

// App's shared state. One instance behind an Arc, handed to every handler.
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    pub client_keys: ClientKeyRegistry,
    pub provider_keys: KeyPool,
    pub rate_limiter: RateLimitStore,
    pub rate_limit: u32, // max requests per client key per hour
}
