use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ConfigError;

// Pool of OpenWeather API keys handed out round-robin.
//
// The cursor is a single atomic counter that only moves forward; each call
// takes one fetch_add and reduces the issued value modulo the pool size.
// There is no reset step, so concurrent callers can never skip a slot or
// hand the same slot to two requests.
pub struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyPool {
    // Create from comma-separated keys "ow-key-1,ow-key-2"
    pub fn new(keys_str: &str) -> Result<Self, ConfigError> {
        let keys: Vec<String> = keys_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::NoProviderKeys);
        }

        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    // Get next key in rotation. The pool is non-empty by construction, so
    // this never fails.
    pub fn next_key(&self) -> &str {
        let issued = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.keys[issued % self.keys.len()]
    }
}
