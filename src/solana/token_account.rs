//! Receiver token accounts
//!
//! The receiver's associated token account must exist before the bridge
//! program can pay into it. Creation is idempotent on chain and is only
//! attempted after an existence check.

use super::rpc::SolanaRpc;
use crate::errors::RelayResult;
use crate::metrics::metrics;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Bounded visibility polling after creation
#[derive(Debug, Clone, Copy)]
pub struct AccountPolling {
    pub max_polls: u32,
    pub interval: Duration,
}

/// Associated token account of `owner` for `mint`, created if absent
///
/// After creating, the account is polled until visible or the polling
/// budget is spent; the address is returned either way.
pub async fn ensure_token_account(
    rpc: &dyn SolanaRpc,
    payer: &Keypair,
    owner: &Pubkey,
    mint: &Pubkey,
    polling: AccountPolling,
) -> RelayResult<Pubkey> {
    let address = get_associated_token_address(owner, mint);

    if rpc.account_exists(&address).await? {
        return Ok(address);
    }

    info!(owner = %owner, mint = %mint, address = %address, "Creating associated token account");

    let instruction =
        create_associated_token_account_idempotent(&payer.pubkey(), owner, mint, &spl_token::id());
    let blockhash = rpc.latest_blockhash().await?;
    let transaction =
        Transaction::new_signed_with_payer(&[instruction], Some(&payer.pubkey()), &[payer], blockhash);
    let signature = rpc.send_transaction(&transaction).await?;
    metrics().token_accounts_created.inc();

    for poll in 0..polling.max_polls {
        if rpc.account_exists(&address).await? {
            info!(address = %address, signature = %signature, polls = poll, "Token account visible");
            return Ok(address);
        }
        sleep(polling.interval).await;
    }

    warn!(
        address = %address,
        signature = %signature,
        "Token account not visible yet, continuing"
    );
    Ok(address)
}
