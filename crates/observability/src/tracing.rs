//! Tracing subscriber initialization.
//!
//! JSON lines by default, filtered through `RUST_LOG` (default `info`).
//! `PAYDESK_LOG_FORMAT=pretty` switches to human-readable output for local
//! development.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,paydesk_session=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Keys: `RUST_LOG`, `PAYDESK_LOG_FORMAT` (`json` | `pretty`).
    /// Unknown formats fall back to JSON.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = lookup("RUST_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let format = match lookup("PAYDESK_LOG_FORMAT")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Self { filter, format }
    }
}

/// Install the global subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_json_at_info() {
        assert_eq!(LogConfig::from_lookup(|_| None), LogConfig::default());
    }

    #[test]
    fn reads_filter_and_format() {
        let config = LogConfig::from_lookup(|key| match key {
            "RUST_LOG" => Some("debug,hyper=warn".to_string()),
            "PAYDESK_LOG_FORMAT" => Some(" Pretty ".to_string()),
            _ => None,
        });
        assert_eq!(config.filter, "debug,hyper=warn");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(LogConfig::default());
        init(LogConfig {
            filter: "not a [valid filter".to_string(),
            format: LogFormat::Pretty,
        });
    }
}
