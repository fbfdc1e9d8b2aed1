//! In-memory upstream for session tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use paydesk_auth::{AuthError, AuthResult, User};

use crate::two_factor::SecondFactor;
use crate::upstream::{
    AuthApi, LoginReply, LoginRequest, LoginResponse, RefreshResponse, SwitchContextRequest,
    SwitchContextResponse, TwoFactorChallenge, VerifySwitchRequest, VerifySwitchResponse,
};

pub(crate) const PASSWORD: &str = "correct horse";
pub(crate) const TOTP: &str = "123456";
pub(crate) const RECOVERY: &str = "ABCD-EFGH";
const CHALLENGE: &str = "challenge-1";

#[derive(Debug, Default)]
struct Inner {
    issued: usize,
    valid_tokens: HashSet<String>,
    calls: Vec<&'static str>,
    unavailable: bool,
}

/// Scripted upstream. Tokens are `token-<n>`; every refresh or switch
/// revokes the presented token.
#[derive(Debug)]
pub(crate) struct FakeAuthApi {
    user: User,
    two_factor: bool,
    inner: Mutex<Inner>,
}

impl FakeAuthApi {
    pub(crate) fn new(user: User) -> Self {
        Self {
            user,
            two_factor: false,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub(crate) fn with_two_factor(mut self) -> Self {
        self.two_factor = true;
        self
    }

    pub(crate) fn email(&self) -> &str {
        &self.user.email
    }

    /// Issue a token as if from an earlier login.
    pub(crate) fn issue_token(&self) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.issued += 1;
        let token = format!("token-{}", inner.issued);
        inner.valid_tokens.insert(token.clone());
        token
    }

    pub(crate) fn revoke_all(&self) {
        self.inner.lock().unwrap().valid_tokens.clear();
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().unavailable = unavailable;
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn enter(&self, call: &'static str) -> AuthResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.unavailable {
            return Err(AuthError::unavailable("upstream down"));
        }
        Ok(())
    }

    fn check_token(&self, token: &str) -> AuthResult<()> {
        if self.inner.lock().unwrap().valid_tokens.contains(token) {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        }
    }

    fn rotate(&self, token: &str) -> String {
        self.inner.lock().unwrap().valid_tokens.remove(token);
        self.issue_token()
    }

    fn login_response(&self) -> LoginResponse {
        LoginResponse {
            user: self.user.clone(),
            access_token: self.issue_token(),
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            context: None,
        }
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginReply> {
        self.enter("login")?;
        if request.email != self.user.email || request.password.expose() != PASSWORD {
            return Err(AuthError::Unauthenticated);
        }
        if self.two_factor {
            return Ok(LoginReply::SecondFactorRequired(TwoFactorChallenge {
                two_factor_token: CHALLENGE.to_string(),
                methods: vec!["totp".to_string(), "recovery".to_string()],
            }));
        }
        Ok(LoginReply::Authenticated(self.login_response()))
    }

    async fn verify_second_factor(
        &self,
        challenge: &TwoFactorChallenge,
        factor: &SecondFactor,
    ) -> AuthResult<LoginResponse> {
        self.enter("verify_second_factor")?;
        if challenge.two_factor_token != CHALLENGE {
            return Err(AuthError::Unauthenticated);
        }
        let accepted = match factor {
            SecondFactor::Totp(code) => code == TOTP,
            SecondFactor::Recovery(code) => code == RECOVERY,
        };
        if !accepted {
            return Err(AuthError::validation("Invalid authentication code"));
        }
        Ok(self.login_response())
    }

    async fn switch_context(
        &self,
        token: &str,
        request: &SwitchContextRequest,
    ) -> AuthResult<SwitchContextResponse> {
        self.enter("switch_context")?;
        self.check_token(token)?;
        if request.require_verification
            && request.password.as_ref().map(|p| p.expose()) != Some(PASSWORD)
        {
            return Err(AuthError::validation("Incorrect password"));
        }
        if !self.user.available_contexts().contains(&request.context_type) {
            return Err(AuthError::unauthorized("context not available"));
        }
        Ok(SwitchContextResponse {
            user: self.user.clone(),
            access_token: self.rotate(token),
            context: request.context_type,
            expires_in: Some(3600),
        })
    }

    async fn verify_switch(&self, token: &str, request: &VerifySwitchRequest) -> AuthResult<VerifySwitchResponse> {
        self.enter("verify_switch")?;
        self.check_token(token)?;
        Ok(VerifySwitchResponse {
            verified: request.password.expose() == PASSWORD,
        })
    }

    async fn me(&self, token: &str) -> AuthResult<User> {
        self.enter("me")?;
        self.check_token(token)?;
        Ok(self.user.clone())
    }

    async fn refresh(&self, token: &str) -> AuthResult<RefreshResponse> {
        self.enter("refresh")?;
        self.check_token(token)?;
        Ok(RefreshResponse {
            access_token: self.rotate(token),
            expires_in: 3600,
        })
    }

    async fn logout(&self, token: &str) -> AuthResult<()> {
        self.enter("logout")?;
        self.inner.lock().unwrap().valid_tokens.remove(token);
        Ok(())
    }
}

pub(crate) fn dual_context_user() -> User {
    use paydesk_auth::AdminProfile;
    use paydesk_core::{UserId, VendorId};

    User::new(UserId::new(), "dual@example.com")
        .with_vendor(VendorId::new())
        .with_admin(AdminProfile {
            is_platform_admin: true,
            ..Default::default()
        })
}

pub(crate) fn vendor_user() -> User {
    use paydesk_core::{UserId, VendorId};

    User::new(UserId::new(), "vendor@example.com").with_vendor(VendorId::new())
}
