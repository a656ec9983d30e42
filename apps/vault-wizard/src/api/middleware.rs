//! # Middleware Module
//!
//! Global rate limiting for the wizard API (`[api] rate_limit`, overridden
//! by `VAULT_WIZARD_RATE_LIMIT`).

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
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared limiter across all clients.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Limiter for `requests_per_second`; `None` when limiting is disabled (0).
pub fn create_rate_limiter(requests_per_second: u32) -> Option<GlobalRateLimiter> {
    let rps = NonZeroU32::new(requests_per_second)?;
    Some(Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Returns 429 once the global quota is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(event = "rate_limited", "Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_limiting() {
        assert!(create_rate_limiter(0).is_none());
    }

    #[test]
    fn quota_is_enforced() {
        let limiter = create_rate_limiter(2).expect("enabled");
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
