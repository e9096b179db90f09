//! Ticker symbol validation against the external registry
//!
//! A candidate is resolved with at most two lookups: the uppercased candidate itself, then the
//! candidate with the [`QUOTE_SUFFIX`] appended. There is no retry loop, a network failure
//! counts the same as an unknown symbol.

use crate::shared::registry::SymbolRegistry;
use tracing::debug;

/// Quote currency appended for the fallback lookup
pub const QUOTE_SUFFIX: &str = "USDT";

/// Result of validating one ticker slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Blank input, nothing to validate
    Skip,
    /// Known to the registry under the contained canonical symbol
    Accepted(String),
    Rejected,
}

impl ValidationOutcome {
    pub fn canonical(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accepted(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationOutcome::Rejected)
    }
}

/// Trim and uppercase raw user input
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub struct SymbolValidator<R> {
    registry: R,
}

impl<R> SymbolValidator<R>
where
    R: SymbolRegistry,
{
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Resolve `candidate` into its canonical registry symbol
    pub async fn validate(&self, candidate: &str) -> ValidationOutcome {
        let symbol = normalize(candidate);
        if symbol.is_empty() {
            return ValidationOutcome::Skip;
        }

        match self.registry.lookup(&symbol).await {
            Ok(()) => return ValidationOutcome::Accepted(symbol),
            Err(error) => debug!(%symbol, %error, "direct lookup failed, trying quote suffix"),
        }

        let suffixed = format!("{symbol}{QUOTE_SUFFIX}");
        match self.registry.lookup(&suffixed).await {
            Ok(()) => ValidationOutcome::Accepted(suffixed),
            Err(error) => {
                debug!(%symbol, %error, "fallback lookup failed, rejecting");
                ValidationOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::shared::{error::RegistryError, registry::SymbolRegistry};
    use async_trait::async_trait;
    use std::{collections::HashSet, sync::Mutex};

    /// In-memory registry that records every lookup
    #[derive(Debug, Default)]
    pub struct MockRegistry {
        known: HashSet<String>,
        unreachable: HashSet<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockRegistry {
        pub fn with_known(symbols: &[&str]) -> Self {
            Self {
                known: symbols.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        /// Lookups of `symbols` fail as if the network dropped
        pub fn with_unreachable(mut self, symbols: &[&str]) -> Self {
            self.unreachable = symbols.iter().map(|s| s.to_string()).collect();
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SymbolRegistry for MockRegistry {
        async fn lookup(&self, symbol: &str) -> Result<(), RegistryError> {
            self.calls.lock().unwrap().push(symbol.to_string());

            if self.unreachable.contains(symbol) {
                return Err(RegistryError::Request {
                    symbol: symbol.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            if self.known.contains(symbol) {
                Ok(())
            } else {
                Err(RegistryError::Status {
                    symbol: symbol.to_string(),
                    status: 400,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::MockRegistry;
    use super::*;

    #[tokio::test]
    async fn test_direct_lookup_accepts_uppercased_candidate() {
        let validator = SymbolValidator::new(MockRegistry::with_known(&["BTCUSDT", "ETH"]));

        assert_eq!(
            validator.validate("eth").await,
            ValidationOutcome::Accepted("ETH".to_string())
        );
        assert_eq!(validator.registry().calls(), vec!["ETH"]);
    }

    #[tokio::test]
    async fn test_fallback_appends_quote_suffix() {
        let validator = SymbolValidator::new(MockRegistry::with_known(&["BTCUSDT"]));

        assert_eq!(
            validator.validate(" btc ").await,
            ValidationOutcome::Accepted("BTCUSDT".to_string())
        );
        assert_eq!(validator.registry().calls(), vec!["BTC", "BTCUSDT"]);
    }

    #[tokio::test]
    async fn test_rejects_after_two_lookups() {
        let validator = SymbolValidator::new(MockRegistry::with_known(&["BTC"]));

        assert_eq!(
            validator.validate("xyz123").await,
            ValidationOutcome::Rejected
        );
        assert_eq!(validator.registry().calls(), vec!["XYZ123", "XYZ123USDT"]);
    }

    #[tokio::test]
    async fn test_network_failure_uses_fallback() {
        let registry = MockRegistry::with_known(&["SOL", "SOLUSDT"]).with_unreachable(&["SOL"]);
        let validator = SymbolValidator::new(registry);

        assert_eq!(
            validator.validate("sol").await,
            ValidationOutcome::Accepted("SOLUSDT".to_string())
        );
    }

    #[tokio::test]
    async fn test_two_network_failures_reject() {
        let registry = MockRegistry::with_known(&["SOL", "SOLUSDT"])
            .with_unreachable(&["SOL", "SOLUSDT"]);
        let validator = SymbolValidator::new(registry);

        assert_eq!(validator.validate("sol").await, ValidationOutcome::Rejected);
        assert_eq!(validator.registry().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_candidate_is_skipped_without_lookup() {
        let validator = SymbolValidator::new(MockRegistry::default());

        assert_eq!(validator.validate("   ").await, ValidationOutcome::Skip);
        assert!(validator.registry().calls().is_empty());
    }

    #[test]
    fn test_outcome_accessors() {
        assert_eq!(
            ValidationOutcome::Accepted("ETH".to_string()).canonical(),
            Some("ETH")
        );
        assert_eq!(ValidationOutcome::Skip.canonical(), None);
        assert!(ValidationOutcome::Rejected.is_rejected());
        assert!(!ValidationOutcome::Skip.is_rejected());
    }
}
