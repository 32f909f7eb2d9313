use std::{env, time::Duration};

pub const DEFAULT_NODE_URL: &str = "http://localhost:3000";

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

#[must_use]
pub fn node_url() -> String {
    env::var("PROBE_NODE_URL").unwrap_or_else(|_| DEFAULT_NODE_URL.to_owned())
}

/// Defaults to empty, which fails account setup before any network call.
#[must_use]
pub fn private_key() -> String {
    env::var("PROBE_PRIVATE_KEY").unwrap_or_default()
}

#[must_use]
pub fn timeout() -> Option<Duration> {
    env::var("PROBE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[must_use]
pub fn poll_interval() -> Duration {
    env::var("PROBE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS), Duration::from_millis)
}
