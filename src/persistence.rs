//! Trade-parameter lookup
//!
//! Parameters agreed when the source swap was created (receiver, destination
//! path, router pool ids) are recovered from the system of record whenever a
//! request carries the "use default" sentinel.

use crate::errors::{RelayError, RelayResult};
use crate::pricing::http::{fill_template, is_empty_json, JsonHttpClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Previously recorded swap parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeParams {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub second_path: Option<Vec<String>>,
    #[serde(default, rename = "pool")]
    pub pool_ids: Option<Vec<u64>>,
}

#[async_trait]
pub trait TradeParamsStore: Send + Sync {
    /// Parameters recorded for a source transaction, matched case-insensitively
    async fn find_trade_params(
        &self,
        from_tx_hash: &str,
        from_network: &str,
    ) -> RelayResult<Option<TradeParams>>;
}

/// Store backed by the relayer HTTP API
pub struct HttpTradeParamsStore {
    http: JsonHttpClient,
    url_template: String,
}

impl HttpTradeParamsStore {
    /// `url_template` carries `{network}` and `{from_tx_hash}` placeholders
    pub fn new(http: JsonHttpClient, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
        }
    }
}

#[async_trait]
impl TradeParamsStore for HttpTradeParamsStore {
    async fn find_trade_params(
        &self,
        from_tx_hash: &str,
        from_network: &str,
    ) -> RelayResult<Option<TradeParams>> {
        let url = fill_template(
            &self.url_template,
            &[("network", from_network), ("from_tx_hash", from_tx_hash)],
        );

        let body = match self.http.try_get_json(&url, &[]).await? {
            Some(body) if !is_empty_json(&body) => body,
            _ => {
                debug!(from_tx_hash = %from_tx_hash, "No trade params recorded");
                return Ok(None);
            }
        };

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| RelayError::Http(format!("Malformed trade params: {}", e)))
    }
}

#[derive(Debug, Clone)]
struct StoredParams {
    from_tx_hash: String,
    from_network: String,
    params: TradeParams,
}

/// In-process store
#[derive(Debug, Default)]
pub struct InMemoryTradeParamsStore {
    records: RwLock<Vec<StoredParams>>,
}

impl InMemoryTradeParamsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, from_tx_hash: &str, from_network: &str, params: TradeParams) {
        self.records.write().await.push(StoredParams {
            from_tx_hash: from_tx_hash.to_string(),
            from_network: from_network.to_string(),
            params,
        });
    }
}

#[async_trait]
impl TradeParamsStore for InMemoryTradeParamsStore {
    async fn find_trade_params(
        &self,
        from_tx_hash: &str,
        from_network: &str,
    ) -> RelayResult<Option<TradeParams>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.from_tx_hash.eq_ignore_ascii_case(from_tx_hash) && r.from_network == from_network)
            .map(|r| r.params.clone()))
    }
}
