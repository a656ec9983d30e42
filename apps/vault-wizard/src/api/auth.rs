//! # Authentication Module
//!
//! Optional bearer-key check for the wizard API.
//!
//! When `VAULT_WIZARD_API_KEY` is set, every endpoint except `/health`
//! requires:
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Compare two keys in time independent of where they differ.
///
/// Both sides are padded to the same length first so the comparison
/// always covers the same number of bytes.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
pub async fn api_key_auth_middleware(
    State(expected): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header_value) = auth_header else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_authorization_header",
            "Missing Authorization header"
        );
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
    };

    let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
    if keys_match(provided, &expected) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_api_key",
            "Authentication failed: invalid API key"
        );
        Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(keys_match("s3cret", "s3cret"));
    }

    #[test]
    fn prefix_and_different_keys_do_not_match() {
        assert!(!keys_match("s3c", "s3cret"));
        assert!(!keys_match("s3cret\0", "s3cret"));
        assert!(!keys_match("s3crex", "s3cret"));
        assert!(!keys_match("", "s3cret"));
    }
}
