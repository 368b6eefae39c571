//! Structured logging for relay lifecycle events

use crate::errors::RelayError;
use crate::observability::CorrelationId;
use crate::types::ChainFamily;

/// Structured logger for one relay
#[derive(Debug, Clone)]
pub struct RelayLogger {
    correlation_id: CorrelationId,
    chain: ChainFamily,
    tx_hash: String,
}

impl RelayLogger {
    pub fn new(chain: ChainFamily, tx_hash: &str) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            chain,
            tx_hash: tx_hash.to_string(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_relay_start(&self, wallet: &str, path_len: usize) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            original_tx_hash = %self.tx_hash,
            wallet = %wallet,
            path_len,
            "Relay started"
        );
    }

    pub fn log_resolved(&self, what: &str, value: &str) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            what = %what,
            value = %value,
            "Resolved on-chain state"
        );
    }

    pub fn log_built(&self, accounts: usize, payload_len: usize) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            accounts,
            payload_len,
            "Payload built"
        );
    }

    pub fn log_submit(&self, attempt: u32, signature: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            attempt,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_resubmit(&self, attempt: u32, error: &RelayError) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            attempt,
            error = %error,
            "Transaction unconfirmed, resubmitting same payload"
        );
    }

    pub fn log_restart(&self, attempt: u32, error: &RelayError) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            attempt,
            error = %error,
            "Connection failure, restarting relay from scratch"
        );
    }

    pub fn log_confirmed(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            original_tx_hash = %self.tx_hash,
            signature = %signature,
            latency_ms,
            "Relay confirmed"
        );
    }

    pub fn log_failed(&self, error: &RelayError, latency_ms: u64) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            chain = %self.chain,
            original_tx_hash = %self.tx_hash,
            category = error.category(),
            error = %error,
            latency_ms,
            "Relay failed"
        );
    }
}
