use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};

use paydesk_auth::AuthError;
use paydesk_session::cookies::ACCESS_TOKEN;
use paydesk_session::CookieJar;

use crate::app::{errors, AppState};
use crate::context::SessionContext;

/// Reject requests without a session token (cookie or bearer) with 401 and
/// cleared session cookies.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let jar = request_jar(req.headers());
    if jar.get(ACCESS_TOKEN).is_none() {
        debug!(path = %req.uri().path(), "request without session token");
        return errors::auth_error_response(&AuthError::Unauthenticated, Vec::new(), &state.session);
    }

    req.extensions_mut().insert(SessionContext::new(jar));
    next.run(req).await
}

/// One log line per request: method, path, status and latency.
pub async fn trace_requests(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = std::time::Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Cookie jar for the incoming request.
pub fn request_jar(headers: &HeaderMap) -> CookieJar {
    let mut raw: Vec<String> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let jar = CookieJar::from_cookie_headers(raw.iter().map(String::as_str));
    if jar.get(ACCESS_TOKEN).is_some() {
        return jar;
    }

    match extract_bearer(headers) {
        Ok(token) => {
            raw.push(format!("{ACCESS_TOKEN}={token}"));
            CookieJar::from_cookie_headers(raw.iter().map(String::as_str))
        }
        Err(_) => jar,
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() || token.contains(';') {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(request_jar(&headers).get(ACCESS_TOKEN), Some("from-cookie"));
    }

    #[test]
    fn bearer_is_folded_into_jar() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("user_context=admin"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let jar = request_jar(&headers);
        assert_eq!(jar.get(ACCESS_TOKEN), Some("abc"));
        assert_eq!(jar.get("user_context"), Some("admin"));
    }

    #[test]
    fn malformed_bearer_is_ignored() {
        for value in ["Basic abc", "Bearer ", "Bearer a;b"] {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
            assert_eq!(request_jar(&headers).get(ACCESS_TOKEN), None, "{value}");
        }
    }
}
