use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use paydesk_session::{SessionConfig, UpstreamConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct BffConfig {
    pub bind_addr: SocketAddr,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
}

impl BffConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Keys: `PAYDESK_UPSTREAM_URL` (required), `PAYDESK_BIND_ADDR`,
    /// `PAYDESK_UPSTREAM_TIMEOUT_SECS`, plus the cookie keys read by
    /// [`SessionConfig::from_lookup`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PAYDESK_UPSTREAM_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("PAYDESK_UPSTREAM_URL must be set"))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow!("PAYDESK_UPSTREAM_URL must be an http(s) URL, got '{base_url}'"));
        }

        let bind_raw = lookup("PAYDESK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid PAYDESK_BIND_ADDR '{bind_raw}'"))?;

        let timeout_secs = match lookup("PAYDESK_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid PAYDESK_UPSTREAM_TIMEOUT_SECS '{raw}'"))?;
                if secs == 0 {
                    return Err(anyhow!("PAYDESK_UPSTREAM_TIMEOUT_SECS must be positive"));
                }
                secs
            }
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        let session = SessionConfig::from_lookup(&lookup)?;

        Ok(Self {
            bind_addr,
            upstream: UpstreamConfig::new(base_url).with_timeout(Duration::from_secs(timeout_secs)),
            session,
        })
    }
}
