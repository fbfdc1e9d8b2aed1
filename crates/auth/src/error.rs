use thiserror::Error;

use crate::token::TokenValidationError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure taxonomy of the session layer.
///
/// Only `Unauthenticated` is handled centrally (cookie purge, forced login);
/// the others are surfaced to the immediate caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, expired or rejected token.
    #[error("session expired, please sign in again")]
    Unauthenticated,

    /// Valid session without the required permission.
    #[error("forbidden: {0}")]
    Unauthorized(String),

    /// Rejected input, e.g. a wrong password on a context switch.
    #[error("{0}")]
    Validation(String),

    /// Upstream unreachable or misbehaving.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Whether this failure must purge the local session.
    pub fn clears_session(&self) -> bool {
        matches!(self, AuthError::Unauthenticated)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::Validation(_) => "validation_error",
            AuthError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::ServiceUnavailable(_) => {
                "The service is temporarily unavailable, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(_: TokenValidationError) -> Self {
        AuthError::Unauthenticated
    }
}
