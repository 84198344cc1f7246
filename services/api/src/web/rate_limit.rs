//! services/api/src/web/rate_limit.rs
//!
//! Per-client-IP throttling of the `/api` routes.

use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub type ClientRateLimiter =
    Arc<RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>>;

/// Allows `max_requests` per `window` for each IP, replenishing evenly.
pub fn new_client_rate_limiter(max_requests: NonZeroU32, window: Duration) -> ClientRateLimiter {
    let period = window / max_requests.get();
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(max_requests))
        .allow_burst(max_requests);
    Arc::new(RateLimiter::keyed(quota))
}
