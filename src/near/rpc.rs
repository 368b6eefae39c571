//! NEAR JSON-RPC seam

use crate::encoding::base58_to_bytes;
use crate::errors::{RelayError, RelayResult};
use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Access key state needed to build a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub block_hash: [u8; 32],
}

#[async_trait]
pub trait NearRpc: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Read-only contract call, result decoded as JSON
    async fn view_function(&self, contract_id: &str, method_name: &str, args: &Value) -> RelayResult<Value>;

    async fn view_access_key(&self, account_id: &str, public_key: &str) -> RelayResult<AccessKeyView>;

    /// Broadcast and wait for execution, returning the transaction hash
    ///
    /// `tx_hash` is the locally computed hash, reported if the node times
    /// out before the outcome is known.
    async fn broadcast_tx_commit(&self, signed_tx_base64: &str, tx_hash: &str) -> RelayResult<String>;
}

pub struct NearJsonRpcClient {
    client: Client,
    endpoint: String,
}

impl NearJsonRpcClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::configuration(format!("Failed to create NEAR RPC client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Outer error: transport. Inner error: the node answered with a failure.
    async fn call_raw(&self, method: &str, params: Value) -> RelayResult<Result<Value, RpcFailure>> {
        let timer = Timer::new();
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::from_reqwest(e, &self.endpoint))?;

        let status = response.status();
        let reply: Value = response
            .json()
            .await
            .map_err(|e| RelayError::rpc(&self.endpoint, format!("{} with unreadable body: {}", status, e)))?;
        timer.observe_duration(&metrics().rpc_latency);

        if let Some(error) = reply.get("error") {
            return Ok(Err(RpcFailure::classify(error)));
        }

        reply
            .get("result")
            .cloned()
            .map(Ok)
            .ok_or_else(|| RelayError::rpc(&self.endpoint, format!("{} without result", method)))
    }

    async fn call(&self, method: &str, params: Value) -> RelayResult<Value> {
        self.call_raw(method, params)
            .await?
            .map_err(|failure| failure.into_error(&self.endpoint))
    }
}

/// Node-reported failure shapes that need different handling
enum RpcFailure {
    Timeout,
    Other(String),
}

impl RpcFailure {
    fn classify(error: &Value) -> Self {
        let cause = error.pointer("/cause/name").and_then(Value::as_str);
        let data = error.get("data").and_then(Value::as_str);
        if cause == Some("TIMEOUT_ERROR") || data == Some("Timeout") {
            Self::Timeout
        } else {
            Self::Other(error.to_string())
        }
    }

    fn into_error(self, endpoint: &str) -> RelayError {
        match self {
            Self::Timeout => RelayError::network(endpoint, "node timed out"),
            Self::Other(message) => RelayError::rpc(endpoint, message),
        }
    }
}

#[async_trait]
impl NearRpc for NearJsonRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn view_function(&self, contract_id: &str, method_name: &str, args: &Value) -> RelayResult<Value> {
        let args_json = serde_json::to_vec(args).map_err(|e| RelayError::encoding(e.to_string()))?;
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method_name,
                    "args_base64": BASE64.encode(args_json),
                }),
            )
            .await?;

        if let Some(error) = result.get("error") {
            return Err(RelayError::rpc(
                &self.endpoint,
                format!("{}.{}: {}", contract_id, method_name, error),
            ));
        }

        let bytes: Vec<u8> = result
            .get("result")
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
            .ok_or_else(|| {
                RelayError::rpc(&self.endpoint, format!("{}.{} returned no bytes", contract_id, method_name))
            })?;

        debug!(contract = %contract_id, method = %method_name, len = bytes.len(), "View call answered");
        serde_json::from_slice(&bytes).map_err(|e| {
            RelayError::encoding(format!("{}.{} result is not JSON: {}", contract_id, method_name, e))
        })
    }

    async fn view_access_key(&self, account_id: &str, public_key: &str) -> RelayResult<AccessKeyView> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;

        if let Some(error) = result.get("error") {
            return Err(RelayError::Signing(format!(
                "Access key {} of {} unavailable: {}",
                public_key, account_id, error
            )));
        }

        let nonce = result
            .get("nonce")
            .and_then(Value::as_u64)
            .ok_or_else(|| RelayError::rpc(&self.endpoint, "access key without nonce"))?;
        let block_hash = result
            .get("block_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::rpc(&self.endpoint, "access key without block hash"))?;
        let block_hash: [u8; 32] = base58_to_bytes(block_hash)?
            .try_into()
            .map_err(|_| RelayError::encoding("block hash is not 32 bytes"))?;

        Ok(AccessKeyView { nonce, block_hash })
    }

    async fn broadcast_tx_commit(&self, signed_tx_base64: &str, tx_hash: &str) -> RelayResult<String> {
        let result = match self.call_raw("broadcast_tx_commit", json!([signed_tx_base64])).await? {
            Ok(result) => result,
            Err(RpcFailure::Timeout) => {
                return Err(RelayError::ChainUnconfirmed {
                    signature: tx_hash.to_string(),
                })
            }
            Err(failure) => return Err(failure.into_error(&self.endpoint)),
        };

        if let Some(failure) = result.pointer("/status/Failure") {
            return Err(RelayError::TransactionFailed {
                signature: tx_hash.to_string(),
                reason: failure.to_string(),
            });
        }

        Ok(result
            .pointer("/transaction/hash")
            .and_then(Value::as_str)
            .unwrap_or(tx_hash)
            .to_string())
    }
}
