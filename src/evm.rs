//! EVM contract-call parameter assembly
//!
//! The EVM signer lives outside this crate; this module only produces the
//! parameters of the bridge contract call. A single-token path is a direct
//! transfer. Longer paths are routed through the DEX aggregator, whose swap
//! call data rides along as `aggregator_data`.

use crate::encoding::{hex_to_array, hex_to_bytes};
use crate::errors::{RelayError, RelayResult};
use crate::pricing::{AggregatorClient, QuoteRequest};
use crate::types::SwapRequest;
use serde::Serialize;
use tracing::info;

/// Bridge contract entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EvmMethod {
    #[serde(rename = "transferTokensToUserWithFee")]
    TransferTokensToUserWithFee,
    #[serde(rename = "swapTokensToUserWithFee")]
    SwapTokensToUserWithFee,
}

/// Call parameters for the bridge contract on an EVM chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmSwapCall {
    pub contract_address: String,
    pub method: EvmMethod,
    pub new_address: String,
    pub token_path: Vec<String>,
    #[serde(serialize_with = "as_decimal_string")]
    pub amount_in_with_fee: u128,
    #[serde(serialize_with = "as_decimal_string")]
    pub amount_out_min: u128,
    #[serde(serialize_with = "as_hex")]
    pub original_tx_hash: [u8; 32],
    #[serde(serialize_with = "as_hex")]
    pub validator_signature: [u8; 65],
    /// Aggregator swap call data, `None` when the contract routes by path
    #[serde(serialize_with = "as_optional_hex")]
    pub aggregator_data: Option<Vec<u8>>,
}

fn as_decimal_string<S: serde::Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn as_hex<S: serde::Serializer, T: AsRef<[u8]>>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

fn as_optional_hex<S: serde::Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(bytes) => as_hex(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

pub struct EvmCallBuilder {
    aggregator: AggregatorClient,
}

impl EvmCallBuilder {
    pub fn new(aggregator: AggregatorClient) -> Self {
        Self { aggregator }
    }

    pub async fn build(&self, request: &SwapRequest) -> RelayResult<EvmSwapCall> {
        let (from_token, to_token) = match (request.token_path.first(), request.token_path.last()) {
            (Some(first), Some(last)) => (first.as_str(), last.as_str()),
            _ => return Err(RelayError::validation("Empty token path")),
        };
        if request.contract_address.is_empty() {
            return Err(RelayError::validation("EVM relay needs the bridge contract address"));
        }

        let original_tx_hash = hex_to_array(&request.original_tx_hash)?;
        let validator_signature = hex_to_array(&request.validator_signature)?;

        let (method, aggregator_data) = if request.token_path.len() == 1 {
            (EvmMethod::TransferTokensToUserWithFee, None)
        } else {
            let quote = QuoteRequest {
                network: &request.destination_network,
                from_token,
                to_token,
                amount_in: request.amount_in,
                amount_out_min: request.amount_out_min,
                original_tx_hash: &request.original_tx_hash,
            };
            let data = self
                .aggregator
                .swap_data(&quote, &request.contract_address, &request.wallet_address)
                .await?
                .filter(|data| !data.is_empty())
                .map(|data| hex_to_bytes(&data))
                .transpose()?;
            (EvmMethod::SwapTokensToUserWithFee, data)
        };

        info!(
            original_tx_hash = %request.original_tx_hash,
            method = ?method,
            aggregator_routed = aggregator_data.is_some(),
            "EVM call assembled"
        );

        Ok(EvmSwapCall {
            contract_address: request.contract_address.clone(),
            method,
            new_address: request.wallet_address.clone(),
            token_path: request.token_path.clone(),
            amount_in_with_fee: request.amount_in,
            amount_out_min: request.amount_out_min,
            original_tx_hash,
            validator_signature,
            aggregator_data,
        })
    }
}
