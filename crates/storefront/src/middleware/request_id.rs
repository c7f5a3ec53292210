//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when it looks sane, otherwise generates
//! a UUID v4. The ID is recorded in the tracing span, tagged on the Sentry
//! scope, copied onto the request for handlers, and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID we accept before replacing it.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Pick the request ID: the upstream value if usable, otherwise a new UUID.
fn resolve_request_id(upstream: Option<&str>) -> String {
    upstream
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned)
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = header.clone() {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let mut response = next.run(request).await;

    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_clean_upstream_id() {
        assert_eq!(resolve_request_id(Some("abc-123_x.y")), "abc-123_x.y");
    }

    #[test]
    fn test_replaces_missing_or_hostile_ids() {
        for upstream in [None, Some(""), Some("has space"), Some("<script>")] {
            let id = resolve_request_id(upstream);
            assert!(Uuid::parse_str(&id).is_ok(), "{upstream:?}");
        }
        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        assert!(Uuid::parse_str(&resolve_request_id(Some(&long))).is_ok());
    }
}
