//! HTTP middleware: API key authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::AppState;

/// Where `REPLAN_API_KEY` is set, every route except `/health` needs the key,
/// given either as `Authorization: Bearer <key>` or as `X-API-Key: <key>`.
/// A missing key answers 401 and a wrong one 403.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let verdict = presented_key(request.headers()).map(|key| keys_match(key, expected));
    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::debug!(path = %request.uri().path(), "rejected request with wrong API key");
            super::json_error(StatusCode::FORBIDDEN, "invalid API key").into_response()
        }
        None => super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response(),
    }
}

/// The key a request carries. A bearer token takes precedence over
/// `X-API-Key`; other `Authorization` schemes are ignored.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
}

/// Compare a presented key against the configured one in time that depends
/// only on the configured key's length.
fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    let mut diff = (presented.len() ^ expected.len()) as u64;
    for (i, b) in expected.iter().enumerate() {
        let p = presented.get(i).copied().unwrap_or(0);
        diff |= u64::from(p ^ b);
    }
    std::hint::black_box(diff) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_wins_over_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        headers.insert("x-api-key", HeaderValue::from_static("from-header"));
        assert_eq!(presented_key(&headers), Some("from-bearer"));
    }

    #[test]
    fn other_authorization_schemes_fall_back_to_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(presented_key(&headers), None);
        headers.insert("x-api-key", HeaderValue::from_static("from-header"));
        assert_eq!(presented_key(&headers), Some("from-header"));
    }

    #[test]
    fn keys_match_requires_exact_bytes() {
        assert!(keys_match("s3cret-key", "s3cret-key"));
        assert!(!keys_match("s3cret-kez", "s3cret-key"));
        assert!(!keys_match("s3cret", "s3cret-key"));
        assert!(!keys_match("s3cret-key-and-more", "s3cret-key"));
        assert!(!keys_match("", "s3cret-key"));
    }

    #[test]
    fn keys_match_treats_trailing_nul_as_a_mismatch() {
        assert!(!keys_match("key\0", "key"));
        assert!(!keys_match("key", "key\0"));
    }
}
