//! AMM pool discovery
//!
//! The pool-listing API returns raw Raydium account blobs. Each blob is
//! decoded into a fresh [`PoolInfo`]; per trading pair only the pool with
//! the largest `swap_pc_in_amount` is kept.

use super::layout::AmmInfoLayout;
use crate::errors::{RelayError, RelayResult};
use crate::pricing::http::{is_empty_json, JsonHttpClient};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// One entry of the pool listing: AMM id and base64 account data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPoolAccount {
    pub pubkey: String,
    pub data_base64: String,
}

#[derive(Deserialize)]
struct PoolListing {
    #[serde(default)]
    result: Vec<PoolListingEntry>,
}

#[derive(Deserialize)]
struct PoolListingEntry {
    pubkey: String,
    account: PoolListingAccount,
}

#[derive(Deserialize)]
struct PoolListingAccount {
    /// `[base64 payload, "base64"]`
    data: Vec<String>,
}

#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pools(&self) -> RelayResult<Vec<RawPoolAccount>>;
}

pub struct HttpPoolSource {
    http: JsonHttpClient,
    url: String,
}

impl HttpPoolSource {
    pub fn new(http: JsonHttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[async_trait]
impl PoolSource for HttpPoolSource {
    async fn fetch_pools(&self) -> RelayResult<Vec<RawPoolAccount>> {
        let body = match self.http.try_get_json(&self.url, &[]).await? {
            Some(body) if !is_empty_json(&body) => body,
            _ => return Err(RelayError::validation("Request to pool API returned empty")),
        };

        let listing: PoolListing = serde_json::from_value(body)
            .map_err(|e| RelayError::Http(format!("Malformed pool listing: {}", e)))?;

        Ok(listing
            .result
            .into_iter()
            .filter_map(|entry| {
                let data = entry.account.data.into_iter().next()?;
                Some(RawPoolAccount {
                    pubkey: entry.pubkey,
                    data_base64: data,
                })
            })
            .collect())
    }
}

/// Decoded AMM routing accounts of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub amm_id: Pubkey,
    pub amm_open_orders: Pubkey,
    pub amm_target_orders: Pubkey,
    pub pool_coin_token_account: Pubkey,
    pub pool_pc_token_account: Pubkey,
    pub serum_market: Pubkey,
    pub coin_mint: Pubkey,
    pub pc_mint: Pubkey,
    pub swap_pc_in_amount: u128,
}

impl PoolInfo {
    pub fn from_raw(raw: &RawPoolAccount) -> RelayResult<Self> {
        let amm_id = Pubkey::from_str(&raw.pubkey)
            .map_err(|e| RelayError::encoding(format!("Invalid AMM id '{}': {}", raw.pubkey, e)))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&raw.data_base64)
            .map_err(|e| RelayError::encoding(format!("Invalid pool data for {}: {}", raw.pubkey, e)))?;
        let layout = AmmInfoLayout::decode(&data)?;

        Ok(Self {
            amm_id,
            amm_open_orders: Pubkey::new_from_array(layout.amm_open_orders),
            amm_target_orders: Pubkey::new_from_array(layout.amm_target_orders),
            pool_coin_token_account: Pubkey::new_from_array(layout.pool_coin_token_account),
            pool_pc_token_account: Pubkey::new_from_array(layout.pool_pc_token_account),
            serum_market: Pubkey::new_from_array(layout.serum_market),
            coin_mint: Pubkey::new_from_array(layout.coin_mint_address),
            pc_mint: Pubkey::new_from_array(layout.pc_mint_address),
            swap_pc_in_amount: layout.swap_pc_in_amount,
        })
    }

    /// `pcMint-coinMint`
    pub fn pair_key(&self) -> String {
        pair_key(&self.pc_mint.to_string(), &self.coin_mint.to_string())
    }
}

pub fn pair_key(first: &str, second: &str) -> String {
    format!("{}-{}", first, second)
}

/// Best pool per pair key
///
/// A later duplicate replaces the kept pool only when its
/// `swap_pc_in_amount` is strictly larger. Undecodable entries and pools
/// without liquidity are skipped.
pub fn select_best_pools(raw: &[RawPoolAccount]) -> HashMap<String, PoolInfo> {
    let mut best: HashMap<String, PoolInfo> = HashMap::new();

    for entry in raw {
        let pool = match PoolInfo::from_raw(entry) {
            Ok(pool) => pool,
            Err(e) => {
                warn!(amm_id = %entry.pubkey, error = %e, "Skipping undecodable pool");
                continue;
            }
        };

        if pool.swap_pc_in_amount == 0 {
            continue;
        }

        let key = pool.pair_key();
        let replace = best
            .get(&key)
            .map_or(true, |kept| pool.swap_pc_in_amount > kept.swap_pc_in_amount);
        if replace {
            best.insert(key, pool);
        }
    }

    best
}

/// Finds the pool routing between two mints
pub struct PoolResolver {
    source: Arc<dyn PoolSource>,
    native_token: String,
    wrapped_token: String,
}

impl PoolResolver {
    pub fn new(source: Arc<dyn PoolSource>, native_token: impl Into<String>, wrapped_token: impl Into<String>) -> Self {
        Self {
            source,
            native_token: native_token.into(),
            wrapped_token: wrapped_token.into(),
        }
    }

    /// Pool for the pair, trying both key orders
    ///
    /// The native sentinel is looked up as the wrapped mint. The listing is
    /// fetched fresh on every call.
    pub async fn find_pool(&self, first_token: &str, second_token: &str) -> RelayResult<Option<PoolInfo>> {
        let second_token = if second_token == self.native_token {
            self.wrapped_token.as_str()
        } else {
            second_token
        };

        let raw = self.source.fetch_pools().await?;
        if raw.is_empty() {
            return Err(RelayError::validation("Request to pool API returned empty"));
        }

        let mut pools = select_best_pools(&raw);
        debug!(candidates = raw.len(), pairs = pools.len(), "Pool listing decoded");

        Ok(pools
            .remove(&pair_key(first_token, second_token))
            .or_else(|| pools.remove(&pair_key(second_token, first_token))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{amm_account, MockPoolSource};

    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const WSOL: &str = "So11111111111111111111111111111111111111112";
    const NATIVE: &str = "11111111111111111111111111111111";

    fn mint(s: &str) -> Pubkey {
        Pubkey::from_str(s).unwrap()
    }

    #[test]
    fn test_pool_info_from_raw() {
        let amm_id = Pubkey::new_unique();
        let raw = amm_account(&amm_id, &mint(WSOL), &mint(USDC), 500);
        let pool = PoolInfo::from_raw(&raw).unwrap();
        assert_eq!(pool.amm_id, amm_id);
        assert_eq!(pool.coin_mint, mint(WSOL));
        assert_eq!(pool.pair_key(), format!("{}-{}", USDC, WSOL));
        assert_eq!(pool.swap_pc_in_amount, 500);
    }

    #[test]
    fn test_strictly_larger_pool_wins() {
        let small = Pubkey::new_unique();
        let big = Pubkey::new_unique();
        let raw = vec![
            amm_account(&small, &mint(WSOL), &mint(USDC), 10),
            amm_account(&big, &mint(WSOL), &mint(USDC), 11),
        ];
        let best = select_best_pools(&raw);
        assert_eq!(best[&pair_key(USDC, WSOL)].amm_id, big);
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();
        let raw = vec![
            amm_account(&first, &mint(WSOL), &mint(USDC), 10),
            amm_account(&second, &mint(WSOL), &mint(USDC), 10),
        ];
        let best = select_best_pools(&raw);
        assert_eq!(best.len(), 1);
        assert_eq!(best[&pair_key(USDC, WSOL)].amm_id, first);
    }

    #[test]
    fn test_pools_without_liquidity_are_skipped() {
        let dry = Pubkey::new_unique();
        let live = Pubkey::new_unique();
        let raw = vec![
            amm_account(&dry, &mint(WSOL), &mint(USDC), 0),
            amm_account(&Pubkey::new_unique(), &mint(WSOL), &mint(NATIVE), 0),
            amm_account(&live, &mint(WSOL), &mint(USDC), 1),
        ];
        let best = select_best_pools(&raw);
        assert_eq!(best.len(), 1);
        assert_eq!(best[&pair_key(USDC, WSOL)].amm_id, live);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let good = Pubkey::new_unique();
        let raw = vec![
            RawPoolAccount {
                pubkey: "not-a-key".into(),
                data_base64: String::new(),
            },
            amm_account(&good, &mint(WSOL), &mint(USDC), 1),
        ];
        assert_eq!(select_best_pools(&raw).len(), 1);
    }

    #[tokio::test]
    async fn test_find_pool_maps_native_and_tries_both_orders() {
        let amm_id = Pubkey::new_unique();
        let source = Arc::new(MockPoolSource::new(vec![amm_account(
            &amm_id,
            &mint(USDC),
            &mint(WSOL),
            1,
        )]));
        let resolver = PoolResolver::new(source.clone(), NATIVE, WSOL);

        // stored key is "WSOL-USDC", first lookup "USDC-WSOL" misses
        let pool = resolver.find_pool(USDC, NATIVE).await.unwrap().unwrap();
        assert_eq!(pool.amm_id, amm_id);
        assert_eq!(source.fetch_count(), 1);

        let missing = resolver.find_pool(USDC, &Pubkey::new_unique().to_string()).await.unwrap();
        assert!(missing.is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_listing_is_validation_error() {
        let resolver = PoolResolver::new(Arc::new(MockPoolSource::new(vec![])), NATIVE, WSOL);
        assert!(matches!(
            resolver.find_pool(USDC, WSOL).await,
            Err(RelayError::Validation(_))
        ));
    }
}
