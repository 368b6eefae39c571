//! Solana RPC seam
//!
//! The relay needs four round-trips: account existence, latest blockhash,
//! send and signature status. [`SolanaRpc`] isolates them so the pipeline
//! can be driven by a mock in tests.

use crate::errors::{RelayError, RelayResult};
use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

/// Landed status of a signature: `None` while unknown, `Some(Err)` if the
/// program rejected it
pub type SignatureStatus = Option<Result<(), String>>;

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn account_exists(&self, address: &Pubkey) -> RelayResult<bool>;

    async fn latest_blockhash(&self) -> RelayResult<Hash>;

    /// Submit without waiting for confirmation
    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature>;

    async fn signature_status(&self, signature: &Signature) -> RelayResult<SignatureStatus>;
}

pub struct SolanaRpcClient {
    client: RpcClient,
    endpoint: String,
    commitment: CommitmentConfig,
}

impl SolanaRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: RpcClient::new_with_commitment(endpoint.clone(), commitment),
            endpoint,
            commitment,
        }
    }
}

#[async_trait]
impl SolanaRpc for SolanaRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn account_exists(&self, address: &Pubkey) -> RelayResult<bool> {
        let timer = Timer::new();
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| RelayError::from_client_error(e, &self.endpoint))?;
        timer.observe_duration(&metrics().rpc_latency);
        Ok(response.value.is_some())
    }

    async fn latest_blockhash(&self) -> RelayResult<Hash> {
        let timer = Timer::new();
        let hash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| RelayError::from_client_error(e, &self.endpoint))?;
        timer.observe_duration(&metrics().rpc_latency);
        Ok(hash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature> {
        let timer = Timer::new();
        let signature = self
            .client
            .send_transaction(transaction)
            .await
            .map_err(|e| RelayError::from_client_error(e, &self.endpoint))?;
        timer.observe_duration(&metrics().rpc_latency);
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> RelayResult<SignatureStatus> {
        let timer = Timer::new();
        let status = self
            .client
            .get_signature_status(signature)
            .await
            .map_err(|e| RelayError::from_client_error(e, &self.endpoint))?;
        timer.observe_duration(&metrics().rpc_latency);
        Ok(status.map(|result| result.map_err(|e| e.to_string())))
    }
}
