//! Shared HTTP session
//!
//! One `reqwest::Client` (and its connection pool) is built per batch
//! controller and cloned into every component that talks to the network.
//! Every batch the controller runs reuses the pool; it closes when the
//! controller and its event streams are dropped. Each request sets its own
//! timeout.

use crate::error::SetupError;
use std::time::Duration;

const USER_AGENT: &str = concat!("mixprep/", env!("CARGO_PKG_VERSION"));

/// Upper bound on establishing a connection, independent of request timeouts
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections kept per host
const POOL_MAX_IDLE_PER_HOST: usize = 8;

/// Build the batch-wide HTTP client
pub fn build_http_client() -> Result<reqwest::Client, SetupError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build()
        .map_err(|e| SetupError::Session(e.to_string()))
}
