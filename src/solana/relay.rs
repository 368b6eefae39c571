//! One Solana relay attempt: resolve, build, sign, submit
//!
//! The relayer key is loaded at the start of the attempt and dropped as
//! soon as the transaction is signed. Resolution finishes before any
//! instruction bytes are produced.

use super::instruction::{
    build_relay_instruction, AmmRoute, ProgramIds, RelayParams, SerumAccounts, TransferMode,
    TransferModeTable, TransferRoute,
};
use super::pools::{PoolResolver, PoolSource};
use super::rpc::SolanaRpc;
use super::submitter::{submit_and_confirm, ConfirmationPolicy};
use super::token_account::{ensure_token_account, AccountPolling};
use crate::config::Config;
use crate::encoding::{bytes_to_base58, hex_to_array};
use crate::errors::{RelayError, RelayResult};
use crate::metrics::{metrics, Timer};
use crate::relayer::ChainRelay;
use crate::retry::RetryConfig;
use crate::structured_logging::RelayLogger;
use crate::types::{ChainFamily, SwapRequest};
use crate::wallet::load_solana_keypair;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub struct SolanaRelay {
    rpc: Arc<dyn SolanaRpc>,
    pools: PoolResolver,
    ids: ProgramIds,
    modes: TransferModeTable,
    serum_markets: HashMap<Pubkey, SerumAccounts>,
    transfer_token: String,
    confirmation: ConfirmationPolicy,
    account_polling: AccountPolling,
    resubmit: RetryConfig,
    secret_file: PathBuf,
}

impl SolanaRelay {
    pub fn new(
        config: &Config,
        rpc: Arc<dyn SolanaRpc>,
        pool_source: Arc<dyn PoolSource>,
    ) -> RelayResult<Self> {
        let solana = &config.solana;

        let serum_markets = solana
            .serum_markets
            .iter()
            .map(|(amm_id, market)| {
                let amm_id = Pubkey::from_str(amm_id).map_err(|e| {
                    RelayError::configuration(format!("Invalid serum market key '{}': {}", amm_id, e))
                })?;
                Ok((amm_id, SerumAccounts::from_config(market)?))
            })
            .collect::<RelayResult<HashMap<_, _>>>()?;

        Ok(Self {
            rpc,
            pools: PoolResolver::new(
                pool_source,
                solana.native_token_address.clone(),
                solana.wrapped_token_address.clone(),
            ),
            ids: ProgramIds::from_config(solana)?,
            modes: TransferModeTable::new(&solana.transfer_token_address, &solana.native_token_address),
            serum_markets,
            transfer_token: solana.transfer_token_address.clone(),
            confirmation: ConfirmationPolicy {
                poll_interval: solana.confirm_poll_interval(),
                max_polls: solana.confirm_max_polls,
            },
            account_polling: AccountPolling {
                max_polls: solana.token_account_max_polls,
                interval: solana.token_account_poll_interval(),
            },
            resubmit: config.relay.resubmit.clone(),
            secret_file: PathBuf::from(&config.relay.secret_file),
        })
    }

    /// Request fields in instruction form
    ///
    /// The wallet may arrive as `0x` hex of the raw key bytes.
    pub fn relay_params(request: &SwapRequest) -> RelayResult<RelayParams> {
        let user = Pubkey::from_str(&bytes_to_base58(&request.wallet_address)?).map_err(|e| {
            RelayError::encoding(format!("Invalid wallet '{}': {}", request.wallet_address, e))
        })?;
        let amount_with_fee = u64::try_from(request.amount_in).map_err(|_| {
            RelayError::validation(format!("amount_in {} does not fit u64", request.amount_in))
        })?;
        let amount_out_min = u64::try_from(request.amount_out_min).map_err(|_| {
            RelayError::validation(format!("amount_out_min {} does not fit u64", request.amount_out_min))
        })?;

        Ok(RelayParams {
            user,
            amount_with_fee,
            amount_out_min,
            original_tx_hash: hex_to_array(&request.original_tx_hash)?,
            validator_sign: hex_to_array(&request.validator_signature)?,
        })
    }

    async fn amm_route(&self, receive_token: &str) -> RelayResult<AmmRoute> {
        let pool = self
            .pools
            .find_pool(&self.transfer_token, receive_token)
            .await?
            .ok_or_else(|| {
                RelayError::validation(format!(
                    "No pool for {} and {}",
                    self.transfer_token, receive_token
                ))
            })?;

        let serum = self.serum_markets.get(&pool.amm_id).cloned().ok_or_else(|| {
            RelayError::validation(format!("No serum market configured for AMM {}", pool.amm_id))
        })?;

        Ok(AmmRoute {
            amm_id: pool.amm_id,
            amm_open_orders: pool.amm_open_orders,
            amm_target_orders: pool.amm_target_orders,
            pool_coin_token_account: pool.pool_coin_token_account,
            pool_pc_token_account: pool.pool_pc_token_account,
            serum_market: pool.serum_market,
            serum,
        })
    }

    async fn receiver_token_account(
        &self,
        payer: &Keypair,
        wallet: &Pubkey,
        receive_token: &str,
    ) -> RelayResult<Pubkey> {
        let mint = Pubkey::from_str(receive_token).map_err(|e| {
            RelayError::encoding(format!("Invalid receive token '{}': {}", receive_token, e))
        })?;
        ensure_token_account(self.rpc.as_ref(), payer, wallet, &mint, self.account_polling).await
    }

    /// Resolve every account the payout mode needs
    pub async fn resolve_route(
        &self,
        receive_token: &str,
        wallet: &Pubkey,
        payer: &Keypair,
    ) -> RelayResult<TransferRoute> {
        match self.modes.mode_for(receive_token) {
            TransferMode::Swap => {
                let amm = self.amm_route(receive_token).await?;
                let receiver_token_account =
                    self.receiver_token_account(payer, wallet, receive_token).await?;
                Ok(TransferRoute::Swap {
                    receiver_token_account,
                    amm,
                })
            }
            TransferMode::Transfer => Ok(TransferRoute::Transfer {
                receiver_token_account: self
                    .receiver_token_account(payer, wallet, receive_token)
                    .await?,
            }),
            TransferMode::Native => Ok(TransferRoute::Native {
                wallet: *wallet,
                amm: self.amm_route(receive_token).await?,
            }),
        }
    }

    /// Resolve, build and sign
    async fn build_signed(&self, request: &SwapRequest, logger: &RelayLogger) -> RelayResult<Transaction> {
        let receive_token = request
            .receive_token()
            .ok_or_else(|| RelayError::validation("Empty token path"))?;
        let params = Self::relay_params(request)?;

        let payer = load_solana_keypair(&self.secret_file)?;
        let relayer = payer.pubkey();
        let timer = Timer::new();

        let route = self.resolve_route(receive_token, &params.user, &payer).await?;
        logger.log_resolved("transfer_mode", &format!("{:?}", route.mode()));

        let instruction = build_relay_instruction(&self.ids, &relayer, &params, &route)?;
        for meta in &instruction.accounts {
            debug!(
                account = %meta.pubkey,
                signer = meta.is_signer,
                writable = meta.is_writable,
                "Relay instruction account"
            );
        }
        logger.log_built(instruction.accounts.len(), instruction.data.len());

        let blockhash = self.rpc.latest_blockhash().await?;
        let transaction =
            Transaction::new_signed_with_payer(&[instruction], Some(&relayer), &[&payer], blockhash);
        timer.observe_duration(&metrics().build_latency);

        Ok(transaction)
    }
}

#[async_trait]
impl ChainRelay for SolanaRelay {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    async fn relay_once(&self, request: &SwapRequest, logger: &RelayLogger) -> RelayResult<String> {
        let transaction = self.build_signed(request, logger).await?;
        let signature = submit_and_confirm(
            self.rpc.as_ref(),
            &transaction,
            self.confirmation,
            &self.resubmit,
            logger,
        )
        .await?;
        Ok(signature.to_string())
    }
}
