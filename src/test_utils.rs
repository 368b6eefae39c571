//! Test Utilities Module
//!
//! Call-counting mocks for the chain RPC seams and the pool listing, plus
//! fixture builders. Scripted results are consumed in order; once a script
//! runs dry every call succeeds.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::errors::{RelayError, RelayResult};
use crate::near::rpc::{AccessKeyView, NearRpc};
use crate::solana::layout::{AmmInfoLayout, AMM_INFO_LEN};
use crate::solana::pools::{PoolSource, RawPoolAccount};
use crate::solana::rpc::{SignatureStatus, SolanaRpc};
use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Mock Solana RPC
///
/// Accounts exist only once added (or once a transaction naming them is
/// sent, with [`creating_accounts_on_send`](Self::creating_accounts_on_send)).
/// Signature status defaults to confirmed.
#[derive(Default)]
pub struct MockSolanaRpc {
    accounts: Mutex<HashSet<Pubkey>>,
    create_on_send: bool,
    statuses: Mutex<VecDeque<SignatureStatus>>,
    send_results: Mutex<VecDeque<RelayResult<()>>>,
    sent: Mutex<Vec<Transaction>>,
    send_count: AtomicUsize,
    account_checks: AtomicUsize,
    blockhash_count: AtomicUsize,
}

impl MockSolanaRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every account a sent transaction references becomes visible
    pub fn creating_accounts_on_send(mut self) -> Self {
        self.create_on_send = true;
        self
    }

    pub async fn add_account(&self, address: Pubkey) {
        self.accounts.lock().await.insert(address);
    }

    /// Queue signature statuses for the next polls
    pub async fn push_statuses(&self, statuses: Vec<SignatureStatus>) {
        self.statuses.lock().await.extend(statuses);
    }

    /// Queue results for the next sends; `Err` sends are not recorded
    pub async fn push_send_results(&self, results: Vec<RelayResult<()>>) {
        self.send_results.lock().await.extend(results);
    }

    /// Successfully sent transactions, in order
    pub async fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().await.clone()
    }

    /// Every send call, failed ones included
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn account_check_count(&self) -> usize {
        self.account_checks.load(Ordering::SeqCst)
    }

    pub fn blockhash_count(&self) -> usize {
        self.blockhash_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SolanaRpc for MockSolanaRpc {
    fn endpoint(&self) -> &str {
        "mock://solana"
    }

    async fn account_exists(&self, address: &Pubkey) -> RelayResult<bool> {
        self.account_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().await.contains(address))
    }

    async fn latest_blockhash(&self) -> RelayResult<Hash> {
        self.blockhash_count.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RelayResult<Signature> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.send_results.lock().await.pop_front() {
            result?;
        }

        if self.create_on_send {
            self.accounts
                .lock()
                .await
                .extend(transaction.message.account_keys.iter().copied());
        }
        self.sent.lock().await.push(transaction.clone());

        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn signature_status(&self, _signature: &Signature) -> RelayResult<SignatureStatus> {
        Ok(self.statuses.lock().await.pop_front().unwrap_or(Some(Ok(()))))
    }
}

/// Mock pool listing returning a fixed set of accounts
pub struct MockPoolSource {
    pools: Vec<RawPoolAccount>,
    failures: Mutex<VecDeque<RelayError>>,
    fetch_count: AtomicUsize,
}

impl MockPoolSource {
    pub fn new(pools: Vec<RawPoolAccount>) -> Self {
        Self {
            pools,
            failures: Mutex::new(VecDeque::new()),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Fail the next fetches with `errors`
    pub async fn push_failures(&self, errors: Vec<RelayError>) {
        self.failures.lock().await.extend(errors);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolSource for MockPoolSource {
    async fn fetch_pools(&self) -> RelayResult<Vec<RawPoolAccount>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().await.pop_front() {
            return Err(err);
        }
        Ok(self.pools.clone())
    }
}

/// Raydium pool blob for `amm_id` trading `coin_mint` against `pc_mint`
///
/// Routing accounts other than the mints are derived from `amm_id` so two
/// pools never share them.
pub fn amm_account(amm_id: &Pubkey, coin_mint: &Pubkey, pc_mint: &Pubkey, swap_pc_in_amount: u128) -> RawPoolAccount {
    let derived = |seed: &[u8]| Pubkey::find_program_address(&[amm_id.as_ref(), seed], amm_id).0.to_bytes();

    let mut layout = AmmInfoLayout::decode(&[0u8; AMM_INFO_LEN]).expect("zeroed layout decodes");
    layout.status = 6;
    layout.coin_decimals = 9;
    layout.pc_decimals = 6;
    layout.swap_pc_in_amount = swap_pc_in_amount;
    layout.coin_mint_address = coin_mint.to_bytes();
    layout.pc_mint_address = pc_mint.to_bytes();
    layout.pool_coin_token_account = derived(b"coin_vault");
    layout.pool_pc_token_account = derived(b"pc_vault");
    layout.amm_open_orders = derived(b"open_orders");
    layout.amm_target_orders = derived(b"target_orders");
    layout.serum_market = derived(b"serum_market");

    RawPoolAccount {
        pubkey: amm_id.to_string(),
        data_base64: base64::engine::general_purpose::STANDARD
            .encode(layout.encode().expect("layout encodes")),
    }
}

/// Secret file holding `SOLANA_RELAYER_PRIVATE_KEY`
pub fn write_solana_secret(key: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    let body = json!({ "SOLANA_RELAYER_PRIVATE_KEY": key });
    file.write_all(body.to_string().as_bytes()).expect("write secret");
    file
}

/// Mock NEAR RPC
///
/// View calls answer from a `(contract, method)` table, `null` when unset.
/// `get_pools` pages are consumed in order and run out as empty pages.
/// Broadcasts succeed with the local hash unless scripted otherwise.
#[derive(Default)]
pub struct MockNearRpc {
    views: Mutex<HashMap<(String, String), Value>>,
    pool_pages: Mutex<HashMap<String, VecDeque<Value>>>,
    view_calls: Mutex<Vec<(String, String, Value)>>,
    broadcast_results: Mutex<VecDeque<RelayResult<String>>>,
    broadcasts: Mutex<Vec<String>>,
    access_key_count: AtomicUsize,
}

impl MockNearRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_view(&self, contract_id: &str, method_name: &str, result: Value) {
        self.views
            .lock()
            .await
            .insert((contract_id.to_string(), method_name.to_string()), result);
    }

    pub async fn push_pool_pages(&self, contract_id: &str, pages: Vec<Value>) {
        self.pool_pages
            .lock()
            .await
            .entry(contract_id.to_string())
            .or_default()
            .extend(pages);
    }

    pub async fn push_broadcast_results(&self, results: Vec<RelayResult<String>>) {
        self.broadcast_results.lock().await.extend(results);
    }

    /// Number of view calls to `method_name` on any contract
    pub async fn view_count(&self, method_name: &str) -> usize {
        self.view_calls
            .lock()
            .await
            .iter()
            .filter(|(_, method, _)| method == method_name)
            .count()
    }

    pub async fn view_calls(&self) -> Vec<(String, String, Value)> {
        self.view_calls.lock().await.clone()
    }

    /// Base64 payloads of every broadcast, in order
    pub async fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().await.clone()
    }

    pub fn access_key_count(&self) -> usize {
        self.access_key_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NearRpc for MockNearRpc {
    fn endpoint(&self) -> &str {
        "mock://near"
    }

    async fn view_function(&self, contract_id: &str, method_name: &str, args: &Value) -> RelayResult<Value> {
        self.view_calls
            .lock()
            .await
            .push((contract_id.to_string(), method_name.to_string(), args.clone()));

        if method_name == "get_pools" {
            return Ok(self
                .pool_pages
                .lock()
                .await
                .get_mut(contract_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| json!([])));
        }

        Ok(self
            .views
            .lock()
            .await
            .get(&(contract_id.to_string(), method_name.to_string()))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn view_access_key(&self, _account_id: &str, _public_key: &str) -> RelayResult<AccessKeyView> {
        self.access_key_count.fetch_add(1, Ordering::SeqCst);
        Ok(AccessKeyView {
            nonce: 41,
            block_hash: [4u8; 32],
        })
    }

    async fn broadcast_tx_commit(&self, signed_tx_base64: &str, tx_hash: &str) -> RelayResult<String> {
        self.broadcasts.lock().await.push(signed_tx_base64.to_string());
        self.broadcast_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(tx_hash.to_string()))
    }
}
