use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque bearer token scoped to one context, plus its expiry.
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token whose expiry is `expires_in` seconds after `now`, capped at
    /// `max_lifetime`. Negative values expire immediately.
    pub fn expiring_in(
        value: impl Into<String>,
        expires_in: i64,
        max_lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = Duration::try_seconds(expires_in.max(0))
            .map_or(max_lifetime, |requested| requested.min(max_lifetime));
        let expires_at = now
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(value, expires_at)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is empty")]
    Empty,

    #[error("token has expired")]
    Expired,
}

/// Local validity check before a token is sent upstream.
///
/// The upstream remains the authority; this only avoids requests that are
/// certain to fail.
pub fn validate_token(token: &SessionToken, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if token.value.trim().is_empty() {
        return Err(TokenValidationError::Empty);
    }
    if token.is_expired(now) {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
