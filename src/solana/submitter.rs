//! Submission and confirmation of a signed transaction
//!
//! The signed transaction is never rebuilt here: every resubmission sends
//! the same bytes, so every attempt carries the same signature. Before a
//! resend the previous signature is checked in case it landed late.

use super::rpc::SolanaRpc;
use crate::errors::{RelayError, RelayResult};
use crate::metrics::metrics;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::structured_logging::RelayLogger;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Signature-status polling after a send
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

/// Poll until the signature lands, fails, or the polling budget runs out
pub async fn await_confirmation(
    rpc: &dyn SolanaRpc,
    signature: &Signature,
    policy: ConfirmationPolicy,
) -> RelayResult<()> {
    let polls = policy.max_polls.max(1);

    for poll in 0..polls {
        match rpc.signature_status(signature).await? {
            Some(Ok(())) => return Ok(()),
            Some(Err(reason)) => {
                return Err(RelayError::TransactionFailed {
                    signature: signature.to_string(),
                    reason,
                })
            }
            None => {
                debug!(signature = %signature, poll = poll + 1, "Signature not confirmed yet");
            }
        }

        if poll + 1 < polls {
            sleep(policy.poll_interval).await;
        }
    }

    Err(RelayError::ChainUnconfirmed {
        signature: signature.to_string(),
    })
}

/// Send `transaction` and wait for confirmation, resubmitting the same
/// payload while the chain reports it unconfirmed
pub async fn submit_and_confirm(
    rpc: &dyn SolanaRpc,
    transaction: &Transaction,
    policy: ConfirmationPolicy,
    resubmit: &RetryConfig,
    logger: &RelayLogger,
) -> RelayResult<Signature> {
    retry_with_backoff(
        "solana_submit",
        resubmit,
        |err| {
            let retry = err.is_resubmittable();
            if retry {
                metrics().resubmissions.inc();
            }
            retry
        },
        |attempt| async move {
            if attempt > 0 {
                if let Some(previous) = transaction.signatures.first() {
                    if let Some(Ok(())) = rpc.signature_status(previous).await? {
                        return Ok(*previous);
                    }
                }
            }

            let signature = rpc.send_transaction(transaction).await?;
            logger.log_submit(attempt + 1, &signature.to_string());

            match await_confirmation(rpc, &signature, policy).await {
                Ok(()) => Ok(signature),
                Err(err) => {
                    if err.is_resubmittable() {
                        logger.log_resubmit(attempt + 1, &err);
                    }
                    Err(err)
                }
            }
        },
    )
    .await
}
