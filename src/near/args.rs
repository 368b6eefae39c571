//! Arguments of `swap_tokens_to_user_with_fee`
//!
//! A single-token path pays the receiver directly. Longer paths add a `msg`
//! with the router hops: the first hop carries the input amount, the last
//! hop carries the minimum output, and every other hop has zero bounds.

use crate::errors::{RelayError, RelayResult};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolHop {
    pub pool_id: u64,
    pub token_in: String,
    pub token_out: String,
    pub min_amount_out: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in: Option<String>,
}

#[derive(Debug, Serialize)]
struct RouterMsg<'a> {
    force: u8,
    actions: &'a [PoolHop],
}

/// Router hops for `path` over `pool_ids`
pub fn pool_hops(path: &[String], pool_ids: &[u64], amount_in: u128, amount_out_min: u128) -> RelayResult<Vec<PoolHop>> {
    let (first_token, last_token) = match (path.first(), path.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(RelayError::validation("Empty token path")),
    };
    if pool_ids.is_empty() {
        return Err(RelayError::validation(format!(
            "No router pool for path {}",
            path.join(" -> ")
        )));
    }

    let mut hops: Vec<PoolHop> = pool_ids
        .iter()
        .map(|&pool_id| PoolHop {
            pool_id,
            token_in: first_token.clone(),
            token_out: last_token.clone(),
            min_amount_out: "0".to_string(),
            amount_in: None,
        })
        .collect();

    if let Some(first) = hops.first_mut() {
        first.amount_in = Some(amount_in.to_string());
    }
    if let Some(last) = hops.last_mut() {
        last.min_amount_out = amount_out_min.to_string();
    }

    Ok(hops)
}

/// Inputs of the swap-to-user call after sentinel substitution
#[derive(Debug, Clone)]
pub struct SwapToUserArgs<'a> {
    pub new_address: &'a str,
    pub path: &'a [String],
    pub amount_in: u128,
    pub amount_out_min: u128,
    pub original_tx_hash: &'a str,
}

impl SwapToUserArgs<'_> {
    /// JSON call arguments; `hops` is ignored for single-token paths
    pub fn to_json(&self, hops: &[PoolHop]) -> RelayResult<Value> {
        let token_out = self
            .path
            .last()
            .ok_or_else(|| RelayError::validation("Empty token path"))?;

        let mut args = json!({
            "params": {
                "new_address": self.new_address,
                "token_out": token_out,
                "amount_in_with_fee": self.amount_in.to_string(),
                "amount_out_min": self.amount_out_min.to_string(),
                "original_tx_hash": self.original_tx_hash,
            }
        });

        if self.path.len() > 1 {
            let msg = serde_json::to_string(&RouterMsg { force: 0, actions: hops })
                .map_err(|e| RelayError::encoding(e.to_string()))?;
            args["msg"] = Value::String(msg);
        }

        Ok(args)
    }
}
