//! Router pool-id discovery
//!
//! Pages through the router's pool list and collects the indices of pools
//! whose token list equals the path exactly.

use super::rpc::NearRpc;
use crate::errors::{RelayError, RelayResult};
use serde_json::{json, Value};
use tracing::{debug, info};

pub struct PoolDiscovery<'a> {
    rpc: &'a dyn NearRpc,
    router_contract: &'a str,
    page_size: u64,
}

impl<'a> PoolDiscovery<'a> {
    pub fn new(rpc: &'a dyn NearRpc, router_contract: &'a str, page_size: u64) -> Self {
        Self {
            rpc,
            router_contract,
            page_size: page_size.max(1),
        }
    }

    pub async fn pool_count(&self) -> RelayResult<u64> {
        let count = self
            .rpc
            .view_function(self.router_contract, "get_number_of_pools", &json!({}))
            .await?;
        Ok(count.as_u64().unwrap_or(0))
    }

    /// Indices of every pool whose `token_account_ids` equal `path`
    pub async fn find_pool_ids(&self, path: &[String]) -> RelayResult<Vec<u64>> {
        if path.len() <= 1 {
            return Ok(Vec::new());
        }

        let total = self.pool_count().await?;
        if total == 0 {
            return Err(RelayError::validation(format!(
                "No pools found in {}",
                self.router_contract
            )));
        }

        let mut pool_ids = Vec::new();
        let mut pool_index = 0u64;

        while pool_index <= total {
            let page = self
                .rpc
                .view_function(
                    self.router_contract,
                    "get_pools",
                    &json!({ "from_index": pool_index, "limit": self.page_size }),
                )
                .await?;

            let pools = page.as_array().map(Vec::as_slice).unwrap_or_default();
            for (offset, pool) in pools.iter().enumerate() {
                if token_ids_match(pool, path) {
                    pool_ids.push(pool_index + offset as u64);
                }
            }
            debug!(from_index = pool_index, page_len = pools.len(), "Scanned router pools");

            pool_index += self.page_size;
        }

        info!(path = %path.join(" -> "), pools = ?pool_ids, "Router pools discovered");
        Ok(pool_ids)
    }
}

fn token_ids_match(pool: &Value, path: &[String]) -> bool {
    pool.get("token_account_ids")
        .and_then(Value::as_array)
        .is_some_and(|ids| {
            ids.len() == path.len()
                && ids.iter().zip(path).all(|(id, token)| id.as_str() == Some(token.as_str()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockNearRpc;

    fn path(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn pool(tokens: &[&str]) -> Value {
        json!({ "token_account_ids": tokens, "pool_kind": "SIMPLE_POOL" })
    }

    #[tokio::test]
    async fn test_pages_until_index_exceeds_total() {
        let rpc = MockNearRpc::new();
        rpc.set_view("v2.ref-finance.near", "get_number_of_pools", json!(5)).await;
        rpc.push_pool_pages(
            "v2.ref-finance.near",
            vec![
                json!([pool(&["a.near", "b.near"]), pool(&["b.near", "a.near"])]),
                json!([pool(&["c.near"]), pool(&["a.near", "b.near"])]),
                json!([pool(&["a.near", "b.near"])]),
            ],
        )
        .await;

        let discovery = PoolDiscovery::new(&rpc, "v2.ref-finance.near", 2);
        let ids = discovery.find_pool_ids(&path(&["a.near", "b.near"])).await.unwrap();

        assert_eq!(ids, vec![0, 3, 4]);
        // indices 0, 2, 4 are all <= 5
        assert_eq!(rpc.view_count("get_pools").await, 3);
    }

    #[tokio::test]
    async fn test_zero_pools_is_validation_error() {
        let rpc = MockNearRpc::new();
        rpc.set_view("v2.ref-finance.near", "get_number_of_pools", json!(0)).await;

        let discovery = PoolDiscovery::new(&rpc, "v2.ref-finance.near", 100);
        let err = discovery.find_pool_ids(&path(&["a.near", "b.near"])).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_single_token_path_skips_discovery() {
        let rpc = MockNearRpc::new();
        let discovery = PoolDiscovery::new(&rpc, "v2.ref-finance.near", 100);
        assert!(discovery.find_pool_ids(&path(&["a.near"])).await.unwrap().is_empty());
        assert_eq!(rpc.view_count("get_number_of_pools").await, 0);
    }
}
