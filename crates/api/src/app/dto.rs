//! Request/response bodies of the auth routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paydesk_auth::{
    AuthError, AuthResult, ContextKind, PermissionService, PermissionWithSource, User,
};
use paydesk_session::{AuthPhase, LoginOutcome, Password, SecondFactor, SessionState};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: Password,
}

#[derive(Debug, Deserialize)]
pub struct SecondFactorBody {
    pub two_factor_token: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub recovery_code: Option<String>,
}

impl SecondFactorBody {
    /// TOTP code when present, else the recovery code.
    pub fn factor(&self) -> AuthResult<SecondFactor> {
        match (&self.code, &self.recovery_code) {
            (Some(code), _) => SecondFactor::totp(code),
            (None, Some(code)) => SecondFactor::recovery(code),
            (None, None) => Err(AuthError::validation(
                "either code or recovery_code is required",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwitchContextBody {
    pub context_type: ContextKind,
    #[serde(default)]
    pub password: Option<Password>,
}

#[derive(Debug, Deserialize)]
pub struct VerifySwitchBody {
    pub password: Password,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub permission: String,
    #[serde(default)]
    pub direct_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginView {
    Authenticated {
        user: User,
        context: Option<ContextKind>,
        available_contexts: Vec<ContextKind>,
    },
    TwoFactorRequired {
        two_factor_token: String,
        methods: Vec<String>,
    },
}

impl From<LoginOutcome> for LoginView {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated { user, context } => LoginView::Authenticated {
                available_contexts: user.available_contexts(),
                user,
                context,
            },
            LoginOutcome::SecondFactorRequired(challenge) => LoginView::TwoFactorRequired {
                two_factor_token: challenge.two_factor_token,
                methods: challenge.methods,
            },
        }
    }
}

/// `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    /// Display hint until `context_confirmed`; restored sessions read it from
    /// the `user_context` cookie.
    pub context: Option<ContextKind>,
    pub context_confirmed: bool,
    pub available_contexts: Vec<ContextKind>,
    pub is_super_admin: bool,
    pub is_platform_admin: bool,
    pub permissions: Vec<PermissionWithSource>,
    pub phase: AuthPhase,
}

impl SessionView {
    pub fn new(user: User, state: &SessionState) -> Self {
        let permissions = PermissionService::new(Some(&user));
        Self {
            is_super_admin: permissions.is_super_admin(),
            is_platform_admin: permissions.is_platform_admin(),
            permissions: permissions.effective_permissions(),
            context: state.current_context,
            context_confirmed: state.context_confirmed,
            available_contexts: state.available_contexts.clone(),
            phase: state.phase,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshView {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SwitchView {
    pub context: Option<ContextKind>,
    pub switched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct VerifyView {
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use paydesk_session::TwoFactorChallenge;
    use serde_json::json;

    #[test]
    fn second_factor_prefers_totp() {
        let body: SecondFactorBody = serde_json::from_value(json!({
            "two_factor_token": "c", "code": "123 456", "recovery_code": "x"
        }))
        .unwrap();
        assert_eq!(body.factor().unwrap(), SecondFactor::Totp("123456".into()));

        let none: SecondFactorBody = serde_json::from_value(json!({ "two_factor_token": "c" })).unwrap();
        assert!(none.factor().is_err());
    }

    #[test]
    fn challenge_view_is_tagged() {
        let view = LoginView::from(LoginOutcome::SecondFactorRequired(TwoFactorChallenge {
            two_factor_token: "c".into(),
            methods: vec!["totp".into()],
        }));
        assert_eq!(
            serde_json::to_value(view).unwrap(),
            json!({ "status": "two_factor_required", "two_factor_token": "c", "methods": ["totp"] })
        );
    }
}
