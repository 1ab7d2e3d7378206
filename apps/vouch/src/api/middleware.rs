//! # Middleware Module
//!
//! Rate limiting for the Vouch HTTP API.
//!
//! Two buckets apply:
//! - `VOUCH_RATE_LIMIT`: requests per second across all clients (default 100)
//! - `VOUCH_CALLER_RATE_LIMIT`: requests per second per `X-Vouch-Caller`
//!   (default 20), applied to requests that carry the header

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed, keyed::DefaultKeyedStateStore},
};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::handlers::CALLER_HEADER;

const DEFAULT_RPS: NonZeroU32 = NonZeroU32::MIN.saturating_add(99);
const DEFAULT_CALLER_RPS: NonZeroU32 = NonZeroU32::MIN.saturating_add(19);

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Per-caller rate limiter type alias.
pub type CallerRateLimiter =
    Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// Limiters shared by the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimits {
    pub global: GlobalRateLimiter,
    pub per_caller: Option<CallerRateLimiter>,
}

/// Create a new global rate limiter. Zero falls back to the default.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Create a limiter keyed by caller identity. Zero falls back to the default.
pub fn create_caller_rate_limiter(requests_per_second: u32) -> CallerRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_CALLER_RPS);
    Arc::new(RateLimiter::keyed(Quota::per_second(rps)))
}

fn rate_from_env(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Value of `VOUCH_RATE_LIMIT`, or 100 if not set.
pub fn get_rate_limit_from_env() -> u32 {
    rate_from_env("VOUCH_RATE_LIMIT", DEFAULT_RPS.get())
}

/// Value of `VOUCH_CALLER_RATE_LIMIT`, or 20 if not set.
pub fn get_caller_rate_limit_from_env() -> u32 {
    rate_from_env("VOUCH_CALLER_RATE_LIMIT", DEFAULT_CALLER_RPS.get())
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests if either bucket is exhausted.
pub async fn rate_limit_middleware(
    State(limits): State<RateLimits>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if limits.global.check().is_err() {
        tracing::warn!("Rate limit exceeded");
        return Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"));
    }

    if let Some(per_caller) = &limits.per_caller {
        let caller = request
            .headers()
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());
        if let Some(caller) = caller {
            if per_caller.check_key(&caller).is_err() {
                tracing::warn!(caller = %caller, "Caller rate limit exceeded");
                return Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"));
            }
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_uses_default() {
        let limiter = create_rate_limiter(0);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn callers_have_separate_buckets() {
        let limiter = create_caller_rate_limiter(1);
        assert!(limiter.check_key(&"alice".to_string()).is_ok());
        assert!(limiter.check_key(&"alice".to_string()).is_err());
        assert!(limiter.check_key(&"bob".to_string()).is_ok());
    }

    #[test]
    fn defaults_are_stable() {
        assert_eq!(DEFAULT_RPS.get(), 100);
        assert_eq!(DEFAULT_CALLER_RPS.get(), 20);
    }
}
