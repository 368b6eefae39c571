//! Cross-chain swap relayer
//!
//! Builds and submits the destination-chain release of a bridged swap:
//! a bridge program instruction on Solana, a router call on NEAR, and the
//! contract-call parameters on EVM chains.
//!
//! [`relayer::Relayer`] dispatches a [`types::SwapRequest`] to the
//! [`relayer::ChainRelay`] of its destination chain and restarts the whole
//! attempt on connection failures.

pub mod config;
pub mod encoding;
pub mod endpoints;
pub mod errors;
pub mod evm;
pub mod metrics;
pub mod near;
pub mod observability;
pub mod persistence;
pub mod pricing;
pub mod relayer;
pub mod retry;
pub mod solana;
pub mod structured_logging;
pub mod test_utils;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use errors::{RelayError, RelayResult};
pub use relayer::{ChainRelay, Relayer};
pub use types::{ChainFamily, SubmissionResult, SwapRequest};
