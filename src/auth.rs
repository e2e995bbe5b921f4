use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::error::ConfigError;

// Header carrying the caller's key. Lowercase so HeaderMap lookups match
// whatever casing the client sent.
pub const API_KEY_HEADER: &str = "x-api-key";

// Why a request failed authentication. Missing and invalid keys produce
// different 401 bodies, so the distinction is kept here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingKey,
    InvalidKey,
}

// Allow-list of client API keys, loaded once at startup and never mutated.
pub struct ClientKeyRegistry {
    keys: HashSet<String>,
}

impl ClientKeyRegistry {
    // Create from comma-separated keys "alpha-key,beta-key"
    pub fn new(keys_str: &str) -> Result<Self, ConfigError> {
        let keys: HashSet<String> = keys_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::NoClientKeys);
        }

        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    // Check the key presented on a request. A blank or absent header counts
    // as missing; anything else is matched exactly against the allow-list.
    pub fn validate<'a>(&self, presented: Option<&'a str>) -> Result<&'a str, AuthRejection> {
        let key = presented.unwrap_or_default();

        if key.trim().is_empty() {
            return Err(AuthRejection::MissingKey);
        }

        if !self.keys.contains(key) {
            return Err(AuthRejection::InvalidKey);
        }

        Ok(key)
    }
}

// Short digest of an API key, safe for log lines. Raw keys never get logged.
pub fn fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}
