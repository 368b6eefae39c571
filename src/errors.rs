//! Error types for the relay pipeline
//!
//! A single taxonomy covers every stage of a relay (resolve, build, sign,
//! submit, confirm). The variant decides how the pipeline reacts:
//! - connection failures restart the whole sequence from scratch
//! - chain-unconfirmed results resubmit the identical signed payload
//! - everything else is terminal and reaches the caller

use solana_client::client_error::{ClientError, ClientErrorKind};
use thiserror::Error;

/// Result alias used across the crate
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Comprehensive error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Input or upstream state that makes the relay impossible
    ///
    /// Examples: empty pool listing, zero pools on the router contract,
    /// no pool for the requested pair, amount does not fit the chain's width
    #[error("Validation error: {0}")]
    Validation(String),

    /// Aggregator quote deviates too far from the requested minimum output
    #[error("Slippage limit exceeded: calculated {slippage}%, max {max}%")]
    SlippageExceeded {
        /// Computed slippage (integer percent)
        slippage: u32,
        /// Configured ceiling
        max: u32,
    },

    /// Could not reach an RPC or HTTP endpoint
    #[error("Transient network error: {message} (endpoint: {endpoint})")]
    TransientNetwork {
        endpoint: String,
        message: String,
    },

    /// Transaction was sent but the chain never reported it as landed
    #[error("Transaction {signature} was not confirmed")]
    ChainUnconfirmed {
        signature: String,
    },

    /// Transaction landed but the program rejected it
    #[error("Transaction {signature} failed on chain: {reason}")]
    TransactionFailed {
        signature: String,
        reason: String,
    },

    /// Malformed address, hash, signature or byte input
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// RPC endpoint answered with an error
    #[error("RPC error: {message} (endpoint: {endpoint})")]
    Rpc {
        endpoint: String,
        message: String,
    },

    /// Failed to load key material or produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected HTTP response from an auxiliary service
    #[error("HTTP error: {0}")]
    Http(String),

    /// Destination chain family has no submission path in this core
    #[error("Unsupported destination chain: {0}")]
    UnsupportedChain(String),

    /// A bounded retry loop gave up
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<RelayError>,
    },
}

impl RelayError {
    /// Connection-level failure: restart resolve, build and submit from scratch
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// Chain-level "not confirmed" result: resubmit the same signed payload
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, Self::ChainUnconfirmed { .. })
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::SlippageExceeded { .. } => "slippage",
            Self::TransientNetwork { .. } => "network",
            Self::ChainUnconfirmed { .. } => "unconfirmed",
            Self::TransactionFailed { .. } => "transaction",
            Self::Encoding(_) => "encoding",
            Self::Rpc { .. } => "rpc",
            Self::Signing(_) => "signing",
            Self::Configuration(_) => "config",
            Self::Http(_) => "http",
            Self::UnsupportedChain(_) => "unsupported",
            Self::RetriesExhausted { .. } => "exhausted",
        }
    }

    /// Classify a Solana client error observed against `endpoint`
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        match err.kind() {
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => Self::TransientNetwork {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            },
            ClientErrorKind::SigningError(_) => Self::Signing(err.to_string()),
            _ => Self::Rpc {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            },
        }
    }

    /// Classify a reqwest error observed against `endpoint`
    pub fn from_reqwest(err: reqwest::Error, endpoint: &str) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::TransientNetwork {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Http(format!("{} ({})", err, endpoint))
        }
    }
}

// Convenience constructors for common error scenarios
impl RelayError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding(reason.into())
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn rpc(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::SlippageExceeded { slippage: 60, max: 50 };
        assert_eq!(
            err.to_string(),
            "Slippage limit exceeded: calculated 60%, max 50%"
        );

        let err = RelayError::network("http://localhost:8899", "connection refused");
        assert_eq!(
            err.to_string(),
            "Transient network error: connection refused (endpoint: http://localhost:8899)"
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(RelayError::network("rpc", "refused").is_connection_failure());
        assert!(!RelayError::network("rpc", "refused").is_resubmittable());

        let unconfirmed = RelayError::ChainUnconfirmed {
            signature: "sig".to_string(),
        };
        assert!(unconfirmed.is_resubmittable());
        assert!(!unconfirmed.is_connection_failure());

        assert!(!RelayError::validation("empty").is_connection_failure());
        assert!(!RelayError::SlippageExceeded { slippage: 50, max: 50 }.is_resubmittable());
        assert!(!RelayError::encoding("bad hex").is_resubmittable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(RelayError::validation("x").category(), "validation");
        assert_eq!(RelayError::rpc("e", "m").category(), "rpc");
        assert_eq!(
            RelayError::RetriesExhausted {
                attempts: 3,
                last_error: Box::new(RelayError::network("e", "m")),
            }
            .category(),
            "exhausted"
        );
    }
}
