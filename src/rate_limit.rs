use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::metrics::ACTIVE_WINDOWS;

// Floor an instant to the top of its UTC hour (14:37:22.9 -> 14:00:00).
fn hour_floor(now: DateTime<Utc>) -> DateTime<Utc> {
    let seconds_into_hour = now.timestamp().rem_euclid(3600);
    now - chrono::Duration::seconds(seconds_into_hour)
        - chrono::Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()))
}

// Usage of one client key within one wall-clock hour.
#[derive(Debug, Clone)]
struct RateWindow {
    window_start: DateTime<Utc>,
    count: u32,
}

impl RateWindow {
    fn starting_at(window_start: DateTime<Utc>) -> Self {
        Self {
            window_start,
            count: 0,
        }
    }

    fn reset_at(&self) -> DateTime<Utc> {
        self.window_start + chrono::Duration::hours(1)
    }
}

// Outcome of a quota check. `remaining` is what is left after this request;
// on a rejection nothing was consumed and remaining is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

// Fixed-window rate limiter keyed by client API key. Windows are aligned to
// wall-clock UTC hours, so every client resets at minute zero no matter when
// it started calling.
//
// Cloning is cheap and shares the underlying map.
#[derive(Clone, Default)]
pub struct RateLimitStore {
    windows: Arc<DashMap<String, RateWindow>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
        }
    }

    // Record one request for `client_key` against `limit` using the real clock.
    pub fn try_consume(&self, client_key: &str, limit: u32) -> RateDecision {
        self.try_consume_at(client_key, limit, Utc::now())
    }

    // Clock-injected variant of try_consume. Outside of tests `now` is
    // always Utc::now().
    pub fn try_consume_at(
        &self,
        client_key: &str,
        limit: u32,
        now: DateTime<Utc>,
    ) -> RateDecision {
        // The entry guard holds the shard lock for this key, so the
        // freshness check, the limit check and the increment below are one
        // atomic step per identity. Other keys proceed in parallel.
        let mut entry = self
            .windows
            .entry(client_key.to_string())
            .or_insert_with(|| RateWindow::starting_at(hour_floor(now)));

        // Window expired..? Start a fresh one for the current hour.
        if now >= entry.reset_at() {
            *entry = RateWindow::starting_at(hour_floor(now));
        }

        let reset_at = entry.reset_at();

        // Over limit..? Reject without consuming anything.
        if entry.count >= limit {
            return RateDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at,
            };
        }

        entry.count += 1;
        RateDecision {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_at,
        }
    }

    // Drop windows whose hour has closed. Correctness does not depend on
    // this; try_consume_at rolls stale windows over on its own. This only
    // keeps the map from accumulating one entry per key forever.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.windows.retain(|_, window| {
            let live = now < window.reset_at();
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    pub fn active_windows(&self) -> usize {
        self.windows.len()
    }
}

// Background sweeper. Runs forever; spawned once at startup.
pub async fn sweep_expired_windows(store: RateLimitStore, period: Duration) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let evicted = store.evict_expired(Utc::now());
        ACTIVE_WINDOWS.set(store.active_windows() as f64);

        if evicted > 0 {
            tracing::debug!(evicted, "evicted expired rate limit windows");
        }
    }
}
