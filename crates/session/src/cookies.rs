//! Session cookies: names, attributes, and a small request-scoped jar.
//!
//! `access_token`, `token_expires_at` and `user_context` always travel
//! together: they are written together and cleared together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use paydesk_auth::{ContextKind, SessionToken};

use crate::config::SessionConfig;

pub const ACCESS_TOKEN: &str = "access_token";
pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";
pub const USER_CONTEXT: &str = "user_context";

pub const SESSION_COOKIES: [&str; 3] = [ACCESS_TOKEN, TOKEN_EXPIRES_AT, USER_CONTEXT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

#[derive(Debug, Error)]
#[error("unsupported cookie same-site policy '{0}'. Use Lax, Strict, or None.")]
pub struct InvalidSameSite(String);

impl FromStr for CookieSameSite {
    type Err = InvalidSameSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(CookieSameSite::Lax),
            "strict" => Ok(CookieSameSite::Strict),
            "none" => Ok(CookieSameSite::None),
            other => Err(InvalidSameSite(other.to_string())),
        }
    }
}

/// A pending `Set-Cookie` instruction.
#[derive(Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
    pub domain: Option<String>,
    pub max_age_secs: i64,
}

impl SetCookie {
    fn with_policy(name: &str, value: String, http_only: bool, config: &SessionConfig) -> Self {
        Self {
            name: name.to_string(),
            value,
            http_only,
            secure: config.secure_cookies,
            same_site: config.same_site,
            path: config.cookie_path.clone(),
            domain: config.cookie_domain.clone(),
            max_age_secs: config.cookie_max_age.num_seconds(),
        }
    }

    /// Expired, empty cookie that makes the browser drop `name`.
    pub fn removal(name: &str, config: &SessionConfig) -> Self {
        Self {
            max_age_secs: 0,
            ..Self::with_policy(name, String::new(), name == ACCESS_TOKEN, config)
        }
    }

    pub fn is_removal(&self) -> bool {
        self.max_age_secs <= 0
    }

    /// Value for a `Set-Cookie` header.
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.max_age_secs.max(0),
            self.same_site.as_str()
        );
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

impl fmt::Debug for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.name == ACCESS_TOKEN && !self.value.is_empty() {
            "<redacted>"
        } else {
            self.value.as_str()
        };
        f.debug_struct("SetCookie")
            .field("name", &self.name)
            .field("value", &value)
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

/// Request-scoped cookie jar.
///
/// Holds the cookies the client sent plus the `Set-Cookie` instructions
/// produced while handling the request. Reads see pending writes.
#[derive(Clone, Default)]
pub struct CookieJar {
    values: BTreeMap<String, String>,
    pending: Vec<SetCookie>,
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one or more `Cookie` header values (`a=1; b=2`).
    pub fn from_cookie_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = BTreeMap::new();
        for header in headers {
            for pair in header.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                values.insert(name.to_string(), value.trim().trim_matches('"').to_string());
            }
        }
        Self {
            values,
            pending: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, cookie: SetCookie) {
        if cookie.is_removal() {
            self.values.remove(&cookie.name);
        } else {
            self.values.insert(cookie.name.clone(), cookie.value.clone());
        }
        self.pending.retain(|c| c.name != cookie.name);
        self.pending.push(cookie);
    }

    pub fn remove(&mut self, name: &str, config: &SessionConfig) {
        self.set(SetCookie::removal(name, config));
    }

    pub fn pending(&self) -> &[SetCookie] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<SetCookie> {
        std::mem::take(&mut self.pending)
    }
}

/// Token and context as recovered from the jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub token: Option<SessionToken>,
    pub context: Option<ContextKind>,
}

/// Write the three session cookies for a freshly issued token.
pub fn store_session(
    jar: &mut CookieJar,
    config: &SessionConfig,
    token: &SessionToken,
    context: Option<ContextKind>,
) {
    jar.set(SetCookie::with_policy(
        ACCESS_TOKEN,
        token.value().to_string(),
        true,
        config,
    ));
    jar.set(SetCookie::with_policy(
        TOKEN_EXPIRES_AT,
        token.expires_at().to_rfc3339(),
        false,
        config,
    ));
    match context {
        Some(context) => jar.set(SetCookie::with_policy(
            USER_CONTEXT,
            context.as_str().to_string(),
            false,
            config,
        )),
        None => jar.remove(USER_CONTEXT, config),
    }
}

/// Whether `value` is a valid unquoted cookie value (RFC 6265
/// `cookie-octet`): no whitespace, `"`, `,`, `;` or a backslash.
pub fn is_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

pub fn clear_session(jar: &mut CookieJar, config: &SessionConfig) {
    for name in SESSION_COOKIES {
        jar.remove(name, config);
    }
}

/// Read the session from the jar. An expired token reads as absent.
///
/// A missing or unreadable `token_expires_at` is bounded by the cookie
/// lifetime.
pub fn read_session(jar: &CookieJar, config: &SessionConfig, now: DateTime<Utc>) -> StoredSession {
    let context = jar.get(USER_CONTEXT).and_then(|v| v.parse().ok());

    let token = jar.get(ACCESS_TOKEN).and_then(|value| {
        let expires_at = jar
            .get(TOKEN_EXPIRES_AT)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now + config.cookie_max_age);
        let token = SessionToken::new(value, expires_at);
        (!token.is_expired(now)).then_some(token)
    });

    StoredSession { token, context }
}
