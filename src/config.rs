use std::fmt;

use crate::error::{AppError, Result};

pub const WEAV3R_API_URL: &str = "https://weav3r.dev";
pub const TORN_API_URL: &str = "https://api.torn.com";
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Fixed cadence of the monitor loop (seconds).
pub const MONITOR_INTERVAL_SECS: u64 = 10;

/// Minimum gap between two item groups' fetches (seconds).
pub const RATE_LIMIT_SECS: u64 = 10;

/// reqwest client timeout for every outbound call.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Listings returned by a price check.
pub const TOP_LISTINGS: usize = 5;

/// `bot_config` key holding the alert destination channel.
pub const NOTIFICATION_CHANNEL_KEY: &str = "notification_channel_id";

/// Placeholder shipped in sample configs; treated the same as an unset key.
const API_KEY_PLACEHOLDER: &str = "TORN_API_KEY";

/// A secret credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input or the sample-config placeholder.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == API_KEY_PLACEHOLDER {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// SQLite file path, or `:memory:` for the in-process store.
    pub db_path: String,
    pub api_port: u16,
    pub monitor_interval_secs: u64,
    pub rate_limit_secs: u64,
    /// Item market + catalog credential (TORN_API_KEY). None degrades those sources.
    pub torn_api_key: Option<ApiKey>,
    pub discord_token: ApiKey,
    /// Bearer token for admin routes (ADMIN_TOKEN). None disables them.
    pub admin_token: Option<ApiKey>,
    pub weav3r_api_url: String,
    pub torn_api_url: String,
    pub discord_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "watcher.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            monitor_interval_secs: std::env::var("MONITOR_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .unwrap_or(MONITOR_INTERVAL_SECS),
            rate_limit_secs: std::env::var("RATE_LIMIT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(RATE_LIMIT_SECS),
            torn_api_key: std::env::var("TORN_API_KEY")
                .ok()
                .and_then(|s| ApiKey::parse(&s)),
            discord_token: std::env::var("DISCORD_TOKEN")
                .ok()
                .and_then(|s| ApiKey::parse(&s))
                .ok_or_else(|| AppError::Config("DISCORD_TOKEN must be set".to_string()))?,
            admin_token: std::env::var("ADMIN_TOKEN")
                .ok()
                .and_then(|s| ApiKey::parse(&s)),
            weav3r_api_url: std::env::var("WEAV3R_API_URL")
                .unwrap_or_else(|_| WEAV3R_API_URL.to_string()),
            torn_api_url: std::env::var("TORN_API_URL")
                .unwrap_or_else(|_| TORN_API_URL.to_string()),
            discord_api_url: std::env::var("DISCORD_API_URL")
                .unwrap_or_else(|_| DISCORD_API_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_placeholder_keys_are_absent() {
        assert!(ApiKey::parse("").is_none());
        assert!(ApiKey::parse("   ").is_none());
        assert!(ApiKey::parse("TORN_API_KEY").is_none());
        assert_eq!(ApiKey::parse(" abc123 ").unwrap().expose(), "abc123");
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = ApiKey::parse("super-secret").unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("super-secret"));
    }
}
