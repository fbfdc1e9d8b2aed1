use anyhow::{anyhow, Context, Result};
use chrono::Duration;

use crate::cookies::CookieSameSite;

const DEFAULT_COOKIE_MAX_AGE_DAYS: i64 = 30;
/// Browsers cap cookie lifetimes at 400 days.
const MAX_COOKIE_MAX_AGE_DAYS: i64 = 400;

/// Cookie policy for the session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Emit the `Secure` attribute (always on in production).
    pub secure_cookies: bool,
    pub same_site: CookieSameSite,
    /// Lifetime of the session cookies, also used as the token expiry when
    /// the upstream does not send `expires_in`.
    pub cookie_max_age: Duration,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: false,
            same_site: CookieSameSite::Lax,
            cookie_max_age: Duration::days(DEFAULT_COOKIE_MAX_AGE_DAYS),
            cookie_domain: None,
            cookie_path: "/".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn production() -> Self {
        Self {
            secure_cookies: true,
            ..Self::default()
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    ///
    /// Keys: `PAYDESK_ENV`, `PAYDESK_COOKIE_SECURE`, `PAYDESK_COOKIE_SAMESITE`,
    /// `PAYDESK_COOKIE_MAX_AGE_DAYS`, `PAYDESK_COOKIE_DOMAIN`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("PAYDESK_ENV")
            .map(|v| v.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let secure_cookies = lookup("PAYDESK_COOKIE_SECURE")
            .map(|v| parse_bool(&v))
            .unwrap_or(production);

        let same_site = lookup("PAYDESK_COOKIE_SAMESITE")
            .map(|v| v.parse::<CookieSameSite>())
            .transpose()
            .context("Failed to parse PAYDESK_COOKIE_SAMESITE")?
            .unwrap_or(CookieSameSite::Lax);

        let max_age_days = match lookup("PAYDESK_COOKIE_MAX_AGE_DAYS") {
            Some(raw) => {
                let days: i64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid PAYDESK_COOKIE_MAX_AGE_DAYS '{raw}'"))?;
                if !(1..=MAX_COOKIE_MAX_AGE_DAYS).contains(&days) {
                    return Err(anyhow!(
                        "PAYDESK_COOKIE_MAX_AGE_DAYS must be between 1 and {MAX_COOKIE_MAX_AGE_DAYS}"
                    ));
                }
                days
            }
            None => DEFAULT_COOKIE_MAX_AGE_DAYS,
        };

        let cookie_domain = lookup("PAYDESK_COOKIE_DOMAIN").and_then(|v| normalize_optional(&v));

        Ok(Self {
            secure_cookies,
            same_site,
            cookie_max_age: Duration::days(max_age_days),
            cookie_domain,
            cookie_path: "/".to_string(),
        })
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_lax_thirty_days_not_secure() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.cookie_max_age, Duration::days(30));
    }

    #[test]
    fn production_turns_on_secure_cookies() {
        let config = SessionConfig::from_lookup(lookup(&[("PAYDESK_ENV", "Production")])).unwrap();
        assert!(config.secure_cookies);

        let overridden = SessionConfig::from_lookup(lookup(&[
            ("PAYDESK_ENV", "production"),
            ("PAYDESK_COOKIE_SECURE", "false"),
        ]))
        .unwrap();
        assert!(!overridden.secure_cookies);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_MAX_AGE_DAYS", "0")])).is_err());
        assert!(SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_MAX_AGE_DAYS", "x")])).is_err());
        assert!(SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_MAX_AGE_DAYS", "401")])).is_err());
        assert!(
            SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_MAX_AGE_DAYS", "9223372036854775807")])).is_err()
        );
        assert!(SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_SAMESITE", "loose")])).is_err());
    }

    #[test]
    fn blank_domain_is_ignored() {
        let config = SessionConfig::from_lookup(lookup(&[("PAYDESK_COOKIE_DOMAIN", "  ")])).unwrap();
        assert_eq!(config.cookie_domain, None);
    }
}
