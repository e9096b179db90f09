/// Client configuration
///
/// Defaults target a correlation server on `localhost:8080` and the public Binance REST API
/// as the symbol registry. Every value can be overridden from the environment.

use crate::shared::error::ConfigError;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Path of the streaming endpoint on the correlation server
pub const STREAM_PATH: &str = "/ws";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Streaming channel URL (`ws://` or `wss://`)
    pub stream_url: String,
    /// Base URL of the external symbol registry
    pub registry_url: String,
    /// Timeout applied to each registry lookup
    pub registry_timeout: Duration,
    /// Ping interval to keep the channel alive
    pub ping_interval: Duration,
    /// Maximum buffered snapshots between the channel task and the UI
    pub channel_buffer_size: usize,
    /// How long a success notice stays visible
    pub notice_ttl: Duration,
    /// Tickers used to prefill the input slots
    pub tickers: Vec<String>,
    /// Diagnostics destination, no logging when absent
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            stream_url: format!("ws://localhost:8080{STREAM_PATH}"),
            registry_url: "https://api.binance.com".to_string(),
            registry_timeout: Duration::from_millis(5000),
            ping_interval: Duration::from_secs(30),
            channel_buffer_size: 256,
            notice_ttl: Duration::from_secs(3),
            tickers: Vec::new(),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from `NEXUSCORR_*` environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("NEXUSCORR_WS_URL") {
            config.stream_url = parse_url(&url)?;
        } else {
            let host = lookup("NEXUSCORR_HOST").unwrap_or_else(|| "localhost:8080".to_string());
            let secure = lookup("NEXUSCORR_SECURE")
                .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);
            config.stream_url = stream_url(&host, secure)?;
        }

        if let Some(url) = lookup("NEXUSCORR_REGISTRY_URL") {
            config.registry_url = parse_url(&url)?;
        }

        if let Some(value) = lookup("NEXUSCORR_REGISTRY_TIMEOUT_MS") {
            let millis = parse_number("NEXUSCORR_REGISTRY_TIMEOUT_MS", &value)?;
            config.registry_timeout = Duration::from_millis(millis);
        }

        if let Some(value) = lookup("NEXUSCORR_PING_SECS") {
            let secs = parse_number("NEXUSCORR_PING_SECS", &value)?;
            config.ping_interval = Duration::from_secs(secs);
        }

        if let Some(value) = lookup("TICKERS") {
            config.tickers = parse_tickers(&value);
        }

        config.log_file = lookup("NEXUSCORR_LOG").map(PathBuf::from);

        Ok(config)
    }

    /// Set streaming channel URL
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Set registry base URL
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Set registry lookup timeout
    pub fn with_registry_timeout(mut self, timeout: Duration) -> Self {
        self.registry_timeout = timeout;
        self
    }

    /// Set ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Set prefilled tickers
    pub fn with_tickers(mut self, tickers: Vec<String>) -> Self {
        self.tickers = tickers;
        self
    }
}

/// Streaming URL for a server `host`, using `wss` when the session itself is served securely
pub fn stream_url(host: &str, secure: bool) -> Result<String, ConfigError> {
    let scheme = if secure { "wss" } else { "ws" };
    parse_url(&format!("{scheme}://{}{STREAM_PATH}", host.trim()))
}

fn parse_url(value: &str) -> Result<String, ConfigError> {
    Url::parse(value.trim())
        .map(String::from)
        .map_err(|error| ConfigError::InvalidUrl {
            value: value.to_string(),
            reason: error.to_string(),
        })
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}

/// Split a comma separated ticker list, dropping blanks
fn parse_tickers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
