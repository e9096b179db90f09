use thiserror::Error;

/// Failure of a single external registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry request for {symbol} failed: {reason}")]
    Request { symbol: String, reason: String },

    #[error("registry rejected {symbol} with HTTP status {status}")]
    Status { symbol: String, status: u16 },
}

impl RegistryError {
    /// Determine if the registry answered and the symbol is simply unknown, as opposed to the
    /// lookup never completing.
    ///
    /// Only used for diagnostics, the validator treats both cases as a failed lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::Status { .. })
    }
}

/// Inbound snapshot could not be interpreted as a correlation matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("failed to parse correlation matrix: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for MatrixError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Errors surfaced by a [`ValidationSession`](super::session::ValidationSession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("at least 2 tickers required (found {found})")]
    InsufficientTickers { found: usize },

    #[error("a validation pass is already in progress")]
    Busy,

    #[error("ticker slot {0} does not exist")]
    SlotOutOfRange(usize),
}

/// Invalid client configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid url {value}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("invalid number for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_is_not_found() {
        struct TestCase {
            input: RegistryError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: registry answered with an error status
                input: RegistryError::Status {
                    symbol: "XYZ".to_string(),
                    status: 400,
                },
                expected: true,
            },
            TestCase {
                // TC1: lookup never completed
                input: RegistryError::Request {
                    symbol: "BTC".to_string(),
                    reason: "operation timed out".to_string(),
                },
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_not_found();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_insufficient_tickers_message() {
        let error = SessionError::InsufficientTickers { found: 1 };
        assert_eq!(error.to_string(), "at least 2 tickers required (found 1)");
    }
}
