//! Common types used throughout the relay pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination chain family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
    Near,
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => write!(f, "evm"),
            Self::Solana => write!(f, "solana"),
            Self::Near => write!(f, "near"),
        }
    }
}

/// One inbound relay request
///
/// Built by the caller from an already-validated source-chain event and
/// never mutated afterwards. Sentinel substitutions produce new values
/// instead of editing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    /// Network name of the source chain (trade-params lookup key)
    pub source_network: String,

    /// Destination chain family
    pub destination_chain: ChainFamily,

    /// Network name of the destination chain (pricing lookups)
    pub destination_network: String,

    /// Bridge contract on the destination chain
    ///
    /// NEAR: receiver of `swap_tokens_to_user_with_fee`. EVM: `fromAddress`
    /// for aggregator routing. Ignored for Solana, which uses the configured
    /// program id.
    #[serde(default)]
    pub contract_address: String,

    /// Receiver on the destination chain
    pub wallet_address: String,

    /// Ordered token identifiers on the destination chain
    pub token_path: Vec<String>,

    /// Bridge-token amount entering the destination swap (fee included)
    pub amount_in: u128,

    /// Minimum acceptable output
    pub amount_out_min: u128,

    /// Source transaction hash, `0x` hex
    pub original_tx_hash: String,

    /// Validator quorum signature, `0x` hex
    #[serde(default)]
    pub validator_signature: String,
}

impl SwapRequest {
    /// Token the user finally receives
    pub fn receive_token(&self) -> Option<&str> {
        self.token_path.last().map(String::as_str)
    }

    /// Short identifier for log lines
    pub fn short_hash(&self) -> &str {
        let end = self
            .original_tx_hash
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.original_tx_hash.len());
        &self.original_tx_hash[..end]
    }
}

/// Confirmation state of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    /// Chain reported the transaction as landed
    Confirmed,
}

/// Terminal outcome of a successful relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub chain: ChainFamily,
    pub transaction_hash: String,
    pub confirmation_status: ConfirmationStatus,
    /// Full pipeline restarts before success
    pub restarts: u32,
}
