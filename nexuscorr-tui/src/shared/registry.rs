//! External symbol registry lookups
//!
//! The registry is an independent third-party exchange API, not the correlation server. A
//! lookup only answers whether a symbol is known: any failure, including a transport error,
//! is reported as an `Err`.

use crate::shared::error::RegistryError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Read-only symbol registry
#[async_trait]
pub trait SymbolRegistry: Send + Sync {
    /// Resolve `symbol` exactly as given
    async fn lookup(&self, symbol: &str) -> Result<(), RegistryError>;
}

/// Registry backed by a Binance-style `exchangeInfo` REST endpoint
#[derive(Debug, Clone)]
pub struct HttpSymbolRegistry {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSymbolRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    fn exchange_info_url(&self) -> String {
        format!(
            "{}/api/v3/exchangeInfo",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SymbolRegistry for HttpSymbolRegistry {
    async fn lookup(&self, symbol: &str) -> Result<(), RegistryError> {
        let response = self
            .client
            .get(self.exchange_info_url())
            .query(&[("symbol", symbol)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RegistryError::Request {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(%symbol, "registry lookup succeeded");
        Ok(())
    }
}
