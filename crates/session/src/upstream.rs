//! Upstream auth API: wire contract and the HTTP client.
//!
//! The upstream is an opaque REST service. Status codes map onto the
//! session error taxonomy:
//! 401 → `Unauthenticated`, 403 → `Unauthorized`, 400/422 → `Validation`,
//! anything else (including transport failures) → `ServiceUnavailable`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use paydesk_auth::{AuthError, AuthResult, ContextKind, User};

use crate::two_factor::SecondFactor;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// Password in transit. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Password,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub context: Option<ContextKind>,
}

/// Second-factor challenge issued instead of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorChallenge {
    pub two_factor_token: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Outcome of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawLoginReply")]
pub enum LoginReply {
    Authenticated(LoginResponse),
    SecondFactorRequired(TwoFactorChallenge),
}

#[derive(Deserialize)]
struct RawLoginReply {
    #[serde(default)]
    requires_2fa: bool,
    #[serde(default)]
    two_factor_token: Option<String>,
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    context: Option<ContextKind>,
}

impl TryFrom<RawLoginReply> for LoginReply {
    type Error = String;

    fn try_from(raw: RawLoginReply) -> Result<Self, Self::Error> {
        if raw.requires_2fa {
            let two_factor_token = raw
                .two_factor_token
                .ok_or("2fa challenge without two_factor_token")?;
            return Ok(LoginReply::SecondFactorRequired(TwoFactorChallenge {
                two_factor_token,
                methods: raw.methods,
            }));
        }
        match (raw.user, raw.access_token) {
            (Some(user), Some(access_token)) => Ok(LoginReply::Authenticated(LoginResponse {
                user,
                access_token,
                token_type: raw.token_type,
                expires_in: raw.expires_in,
                context: raw.context,
            })),
            _ => Err("login response without user or access_token".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecondFactorRequest<'a> {
    pub two_factor_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchContextRequest {
    pub context_type: ContextKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
    pub require_verification: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwitchContextResponse {
    pub user: User,
    pub access_token: String,
    pub context: ContextKind,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifySwitchRequest {
    pub password: Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VerifySwitchResponse {
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream auth endpoints used by the session layer.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginReply>;

    async fn verify_second_factor(
        &self,
        challenge: &TwoFactorChallenge,
        factor: &SecondFactor,
    ) -> AuthResult<LoginResponse>;

    async fn switch_context(
        &self,
        token: &str,
        request: &SwitchContextRequest,
    ) -> AuthResult<SwitchContextResponse>;

    async fn verify_switch(&self, token: &str, request: &VerifySwitchRequest) -> AuthResult<VerifySwitchResponse>;

    async fn me(&self, token: &str) -> AuthResult<User>;

    async fn refresh(&self, token: &str) -> AuthResult<RefreshResponse>;

    async fn logout(&self, token: &str) -> AuthResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(config: &UpstreamConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AuthResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::unavailable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AuthError::unavailable(format!("malformed upstream response: {e}")));
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &body))
    }

    async fn send_ignoring_body(&self, request: RequestBuilder) -> AuthResult<()> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::unavailable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &body))
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginReply> {
        self.send(self.client.post(self.url("/auth/login")).json(request))
            .await
    }

    async fn verify_second_factor(
        &self,
        challenge: &TwoFactorChallenge,
        factor: &SecondFactor,
    ) -> AuthResult<LoginResponse> {
        let (path, body) = match factor {
            SecondFactor::Totp(code) => (
                "/auth/2fa/verify",
                SecondFactorRequest {
                    two_factor_token: &challenge.two_factor_token,
                    code: Some(code.as_str()),
                    recovery_code: None,
                },
            ),
            SecondFactor::Recovery(code) => (
                "/auth/2fa/recovery",
                SecondFactorRequest {
                    two_factor_token: &challenge.two_factor_token,
                    code: None,
                    recovery_code: Some(code.as_str()),
                },
            ),
        };
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn switch_context(
        &self,
        token: &str,
        request: &SwitchContextRequest,
    ) -> AuthResult<SwitchContextResponse> {
        self.send(
            self.client
                .post(self.url("/auth/switch-context"))
                .bearer_auth(token)
                .json(request),
        )
        .await
    }

    async fn verify_switch(&self, token: &str, request: &VerifySwitchRequest) -> AuthResult<VerifySwitchResponse> {
        self.send(
            self.client
                .post(self.url("/auth/verify-switch"))
                .bearer_auth(token)
                .json(request),
        )
        .await
    }

    async fn me(&self, token: &str) -> AuthResult<User> {
        self.send(self.client.get(self.url("/auth/me")).bearer_auth(token))
            .await
    }

    async fn refresh(&self, token: &str) -> AuthResult<RefreshResponse> {
        self.send(self.client.post(self.url("/auth/refresh")).bearer_auth(token))
            .await
    }

    async fn logout(&self, token: &str) -> AuthResult<()> {
        self.send_ignoring_body(self.client.post(self.url("/auth/logout")).bearer_auth(token))
            .await
    }
}

/// Map a non-success upstream status onto the session error taxonomy.
pub fn error_from_status(status: StatusCode, body: &str) -> AuthError {
    debug!(status = status.as_u16(), "upstream rejected request");
    match status {
        StatusCode::UNAUTHORIZED => AuthError::Unauthenticated,
        StatusCode::FORBIDDEN => AuthError::unauthorized(
            upstream_message(body).unwrap_or_else(|| "not permitted".to_string()),
        ),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AuthError::validation(
            upstream_message(body).unwrap_or_else(|| "request rejected".to_string()),
        ),
        other => AuthError::unavailable(format!("upstream returned {other}")),
    }
}

/// Human-readable message from an upstream error body, if any.
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn user_json() -> serde_json::Value {
        json!({
            "id": "0190a5a0-0000-7000-8000-000000000001",
            "email": "ops@example.com",
            "permissions": ["View Transactions"]
        })
    }

    fn api(server: &MockServer) -> HttpAuthApi {
        HttpAuthApi::new(&UpstreamConfig::new(server.base_url())).expect("client")
    }

    #[test]
    fn login_reply_variants() {
        let ok: LoginReply = serde_json::from_value(json!({
            "user": user_json(), "access_token": "t", "token_type": "bearer"
        }))
        .unwrap();
        assert!(matches!(ok, LoginReply::Authenticated(ref r) if r.access_token == "t"));

        let challenge: LoginReply = serde_json::from_value(json!({
            "requires_2fa": true, "two_factor_token": "c", "methods": ["totp", "recovery"]
        }))
        .unwrap();
        assert!(matches!(challenge, LoginReply::SecondFactorRequired(ref c) if c.two_factor_token == "c"));

        assert!(serde_json::from_value::<LoginReply>(json!({ "requires_2fa": true })).is_err());
        assert!(serde_json::from_value::<LoginReply>(json!({ "access_token": "t" })).is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(error_from_status(StatusCode::UNAUTHORIZED, ""), AuthError::Unauthenticated);
        assert_eq!(
            error_from_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"Incorrect password"}"#),
            AuthError::validation("Incorrect password")
        );
        assert_eq!(
            error_from_status(StatusCode::BAD_REQUEST, "not json"),
            AuthError::validation("request rejected")
        );
        assert!(matches!(
            error_from_status(StatusCode::FORBIDDEN, r#"{"message":"no admin access"}"#),
            AuthError::Unauthorized(ref m) if m == "no admin access"
        ));
        assert!(matches!(
            error_from_status(StatusCode::BAD_GATEWAY, ""),
            AuthError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn switch_request_omits_password_when_absent() {
        let body = serde_json::to_value(SwitchContextRequest {
            context_type: ContextKind::Vendor,
            password: None,
            require_verification: false,
        })
        .unwrap();
        assert_eq!(body, json!({ "context_type": "vendor", "require_verification": false }));
    }

    #[test]
    fn password_debug_is_redacted() {
        assert!(!format!("{:?}", Password::new("hunter2")).contains("hunter2"));
    }

    #[tokio::test]
    async fn login_posts_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/login")
                    .json_body(json!({ "email": "ops@example.com", "password": "pw" }));
                then.status(200)
                    .json_body(json!({ "user": user_json(), "access_token": "tok", "token_type": "bearer" }));
            })
            .await;

        let reply = api(&server)
            .login(&LoginRequest {
                email: "ops@example.com".into(),
                password: Password::new("pw"),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(matches!(reply, LoginReply::Authenticated(ref r) if r.access_token == "tok"));
    }

    #[tokio::test]
    async fn me_sends_bearer_token_and_maps_401() {
        let server = MockServer::start_async().await;
        let ok = server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/me").header("authorization", "Bearer good");
                then.status(200).json_body(user_json());
            })
            .await;
        let expired = server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/me").header("authorization", "Bearer stale");
                then.status(401).json_body(json!({ "detail": "Token expired" }));
            })
            .await;

        let api = api(&server);
        let user = api.me("good").await.unwrap();
        assert_eq!(user.email, "ops@example.com");
        assert_eq!(api.me("stale").await, Err(AuthError::Unauthenticated));

        ok.assert_async().await;
        expired.assert_async().await;
    }

    #[tokio::test]
    async fn recovery_code_uses_recovery_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/2fa/recovery")
                    .json_body(json!({ "two_factor_token": "c", "recovery_code": "ABCD-1234" }));
                then.status(200)
                    .json_body(json!({ "user": user_json(), "access_token": "tok" }));
            })
            .await;

        let challenge = TwoFactorChallenge {
            two_factor_token: "c".into(),
            methods: vec![],
        };
        let response = api(&server)
            .verify_second_factor(&challenge, &SecondFactor::Recovery("ABCD-1234".into()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.access_token, "tok");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_service_unavailable() {
        let api = HttpAuthApi::new(
            &UpstreamConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_millis(500)),
        )
        .unwrap();
        assert!(matches!(api.refresh("t").await, Err(AuthError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn logout_ignores_response_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/logout");
                then.status(204);
            })
            .await;

        api(&server).logout("tok").await.unwrap();
        mock.assert_async().await;
    }
}
