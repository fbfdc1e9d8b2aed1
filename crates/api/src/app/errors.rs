use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use paydesk_auth::AuthError;
use paydesk_session::cookies::SESSION_COOKIES;
use paydesk_session::{SessionConfig, SetCookie};

pub fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::Unauthorized(_) => StatusCode::FORBIDDEN,
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Error body for `err`, carrying `cookies`.
///
/// A 401 always clears every session cookie instead.
pub fn auth_error_response(err: &AuthError, cookies: Vec<SetCookie>, config: &SessionConfig) -> Response {
    if let AuthError::ServiceUnavailable(detail) = err {
        warn!(detail = %detail, "upstream unavailable");
    }
    let cookies = if err.clears_session() {
        cleared_cookies(config)
    } else {
        cookies
    };
    with_cookies(
        json_error(auth_error_status(err), err.code(), err.user_message()),
        cookies,
    )
}

/// Removal instructions for every session cookie.
pub fn cleared_cookies(config: &SessionConfig) -> Vec<SetCookie> {
    SESSION_COOKIES
        .iter()
        .map(|name| SetCookie::removal(name, config))
        .collect()
}

pub fn with_cookies(mut response: Response, cookies: Vec<SetCookie>) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => warn!(cookie = %cookie.name, "dropping cookie with invalid header value"),
        }
    }
    response
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
