//! Token USD price lookup
//!
//! The primary price index is queried first; when it has no entry for the
//! token the backend token-data service is asked instead. Missing data from
//! both yields zero, never an error.

use super::http::{fill_template, is_empty_json, json_to_decimal, JsonHttpClient};
use crate::config::PricingConfig;
use crate::encoding::round_fiat_decimals;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

pub struct PriceOracle {
    http: JsonHttpClient,
    config: PricingConfig,
}

impl PriceOracle {
    pub fn new(http: JsonHttpClient, config: PricingConfig) -> Self {
        Self { http, config }
    }

    pub async fn token_usd_price(&self, token_address: &str, network: &str) -> Decimal {
        if let Some(data) = self.price_index_data(token_address, network).await {
            let price = data
                .pointer("/market_data/current_price/usd")
                .and_then(json_to_decimal)
                .unwrap_or(Decimal::ZERO);
            debug!(token = %token_address, network = %network, %price, "Price index hit");
            return price;
        }

        let price = self
            .backend_token_data(token_address, network)
            .await
            .and_then(|data| data.get("usd_price").and_then(json_to_decimal))
            .unwrap_or(Decimal::ZERO);
        debug!(token = %token_address, network = %network, %price, "Backend token price");
        price
    }

    /// [`token_usd_price`](Self::token_usd_price) at fiat precision, for
    /// anything reported outside the process
    pub async fn fiat_usd_price(&self, token_address: &str, network: &str) -> Decimal {
        round_fiat_decimals(self.token_usd_price(token_address, network).await)
    }

    async fn price_index_data(&self, token_address: &str, network: &str) -> Option<Value> {
        let platform = self
            .config
            .price_index_networks
            .get(network)
            .map(String::as_str)
            .unwrap_or("");
        let token = token_address.to_lowercase();
        let url = fill_template(
            &self.config.price_index_url,
            &[("network", platform), ("token_address", &token)],
        );

        self.http.get_json(&url, &[]).await.filter(|v| !is_empty_json(v))
    }

    async fn backend_token_data(&self, token_address: &str, network: &str) -> Option<Value> {
        let url = fill_template(
            &self.config.backend_token_url,
            &[("network", network), ("token_address", token_address)],
        );

        match self.http.get_json(&url, &[]).await? {
            Value::Array(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
            _ => None,
        }
    }
}
