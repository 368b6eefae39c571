//! One NEAR relay attempt
//!
//! Recorded trade parameters replace the "use default" sentinels, the
//! receiver is registered with every token contract on the path, and the
//! bridge contract's `swap_tokens_to_user_with_fee` is called.

use super::args::{pool_hops, PoolHop, SwapToUserArgs};
use super::pools::PoolDiscovery;
use super::rpc::{AccessKeyView, NearRpc};
use super::transaction::{FunctionCall, Transaction};
use crate::config::{NearConfig, RelayConfig};
use crate::errors::{RelayError, RelayResult};
use crate::metrics::metrics;
use crate::persistence::{TradeParams, TradeParamsStore};
use crate::pricing::http::{is_empty_json, json_to_u128};
use crate::relayer::ChainRelay;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::structured_logging::RelayLogger;
use crate::types::{ChainFamily, SwapRequest};
use crate::wallet::NearSigner;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const NATIVE_NEAR: &str = "near";
const SWAP_TO_USER_METHOD: &str = "swap_tokens_to_user_with_fee";

/// Relayer access key state for one relay attempt
///
/// Fetched once; every transaction of the attempt takes the next nonce
/// from here.
struct KeySession {
    next_nonce: u64,
    block_hash: [u8; 32],
}

impl KeySession {
    fn new(view: AccessKeyView) -> Self {
        Self {
            next_nonce: view.nonce + 1,
            block_hash: view.block_hash,
        }
    }

    fn take_nonce(&mut self) -> u64 {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        nonce
    }
}

pub struct NearRelay {
    rpc: Arc<dyn NearRpc>,
    trade_params: Arc<dyn TradeParamsStore>,
    config: NearConfig,
    default_address: String,
    alternative_default_address: String,
    resubmit: RetryConfig,
}

impl NearRelay {
    pub fn new(
        near: &NearConfig,
        relay: &RelayConfig,
        rpc: Arc<dyn NearRpc>,
        trade_params: Arc<dyn TradeParamsStore>,
    ) -> Self {
        Self {
            rpc,
            trade_params,
            config: near.clone(),
            default_address: relay.default_crypto_address.clone(),
            alternative_default_address: relay.alternative_default_crypto_address.clone(),
            resubmit: relay.resubmit.clone(),
        }
    }

    fn signer(&self) -> RelayResult<NearSigner> {
        let secret = self
            .config
            .private_key
            .as_deref()
            .ok_or_else(|| RelayError::configuration("NEAR private key is not configured"))?;
        NearSigner::from_secret_key(&self.config.relayer_account_id, secret)
    }

    fn is_default_address(&self, address: &str) -> bool {
        address.eq_ignore_ascii_case(&self.default_address)
            || address.eq_ignore_ascii_case(&self.alternative_default_address)
    }

    /// Receiver after sentinel substitution
    pub fn resolve_wallet(&self, wallet: &str, recorded: Option<&TradeParams>) -> RelayResult<String> {
        if !self.is_default_address(wallet) {
            return Ok(wallet.to_string());
        }
        recorded
            .and_then(|params| params.wallet_address.clone())
            .ok_or_else(|| RelayError::validation("Default wallet sentinel without recorded walletAddress"))
    }

    /// Token path after sentinel substitution
    pub fn resolve_path(&self, path: &[String], recorded: Option<&TradeParams>) -> RelayResult<Vec<String>> {
        if !path.iter().any(|token| token.eq_ignore_ascii_case(&self.default_address)) {
            return Ok(path.to_vec());
        }
        recorded
            .and_then(|params| params.second_path.clone())
            .filter(|path| !path.is_empty())
            .ok_or_else(|| RelayError::validation("Default token sentinel without recorded secondPath"))
    }

    async fn open_session(&self, signer: &NearSigner) -> RelayResult<KeySession> {
        let view = self
            .rpc
            .view_access_key(signer.account_id(), &signer.public_key_string())
            .await?;
        Ok(KeySession::new(view))
    }

    /// Register `wallet` with every token contract on `path` that lacks it
    async fn register_storage(
        &self,
        signer: &NearSigner,
        session: &mut KeySession,
        path: &[String],
        wallet: &str,
        logger: &RelayLogger,
    ) -> RelayResult<()> {
        let account = json!({ "account_id": wallet });

        for token in path.iter().filter(|token| token.as_str() != NATIVE_NEAR) {
            let balance = self.rpc.view_function(token, "storage_balance_of", &account).await?;
            if !is_empty_json(&balance) {
                continue;
            }

            let bounds = self.rpc.view_function(token, "storage_balance_bounds", &account).await?;
            let deposit = ["max", "min"]
                .iter()
                .filter_map(|bound| bounds.get(*bound))
                .find_map(json_to_u128)
                .ok_or_else(|| {
                    RelayError::validation(format!("{} reported no storage balance bounds", token))
                })?;

            info!(token = %token, wallet = %wallet, deposit, "Registering receiver storage");
            let call = self.call("storage_deposit", &account, deposit)?;
            self.function_call(signer, session, token, call, logger).await?;
            metrics().token_accounts_created.inc();
        }

        Ok(())
    }

    async fn hops(
        &self,
        path: &[String],
        recorded: Option<&TradeParams>,
        request: &SwapRequest,
    ) -> RelayResult<Vec<PoolHop>> {
        if path.len() <= 1 {
            return Ok(Vec::new());
        }

        let pool_ids = match recorded.and_then(|params| params.pool_ids.clone()) {
            Some(ids) => ids,
            None => {
                PoolDiscovery::new(
                    self.rpc.as_ref(),
                    &self.config.ref_finance_contract,
                    self.config.pool_page_size,
                )
                .find_pool_ids(path)
                .await?
            }
        };

        pool_hops(path, &pool_ids, request.amount_in, request.amount_out_min)
    }

    fn call(&self, method_name: &str, args: &Value, deposit: u128) -> RelayResult<FunctionCall> {
        Ok(FunctionCall {
            method_name: method_name.to_string(),
            args: serde_json::to_vec(args).map_err(|e| RelayError::encoding(e.to_string()))?,
            gas: self.config.function_call_gas,
            deposit,
        })
    }

    /// Sign one function call and broadcast it, rebroadcasting the same
    /// payload while the node times out
    async fn function_call(
        &self,
        signer: &NearSigner,
        session: &mut KeySession,
        receiver_id: &str,
        call: FunctionCall,
        logger: &RelayLogger,
    ) -> RelayResult<String> {
        let signed = Transaction::function_call(
            signer,
            session.take_nonce(),
            receiver_id,
            session.block_hash,
            call,
        )
        .sign(signer)?;
        let payload = signed.to_base64()?;
        let tx_hash = signed.hash();
        logger.log_built(1, payload.len());

        let rpc = self.rpc.as_ref();
        let (payload, tx_hash) = (payload.as_str(), tx_hash.as_str());
        retry_with_backoff(
            "near_broadcast",
            &self.resubmit,
            |err| {
                let retry = err.is_resubmittable();
                if retry {
                    metrics().resubmissions.inc();
                }
                retry
            },
            |attempt| async move {
                logger.log_submit(attempt + 1, tx_hash);
                let result = rpc.broadcast_tx_commit(payload, tx_hash).await;
                if let Err(err) = &result {
                    if err.is_resubmittable() {
                        logger.log_resubmit(attempt + 1, err);
                    }
                }
                result
            },
        )
        .await
    }
}

#[async_trait]
impl ChainRelay for NearRelay {
    fn chain(&self) -> ChainFamily {
        ChainFamily::Near
    }

    async fn relay_once(&self, request: &SwapRequest, logger: &RelayLogger) -> RelayResult<String> {
        let recorded = self
            .trade_params
            .find_trade_params(&request.original_tx_hash, &request.source_network)
            .await?;
        let recorded = recorded.as_ref();

        let wallet = self.resolve_wallet(&request.wallet_address, recorded)?;
        let path = self.resolve_path(&request.token_path, recorded)?;
        logger.log_resolved("wallet", &wallet);
        logger.log_resolved("path", &path.join(" -> "));

        let signer = self.signer()?;
        let mut session = self.open_session(&signer).await?;
        self.register_storage(&signer, &mut session, &path, &wallet, logger).await?;

        let hops = self.hops(&path, recorded, request).await?;
        let args = SwapToUserArgs {
            new_address: &wallet,
            path: &path,
            amount_in: request.amount_in,
            amount_out_min: request.amount_out_min,
            original_tx_hash: &request.original_tx_hash,
        }
        .to_json(&hops)?;

        let contract = if request.contract_address.is_empty() {
            self.config.multichain_contract.as_str()
        } else {
            request.contract_address.as_str()
        };

        let call = self.call(SWAP_TO_USER_METHOD, &args, 0)?;
        self.function_call(&signer, &mut session, contract, call, logger).await
    }
}
