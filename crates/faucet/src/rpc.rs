//! JSON-RPC client for the ledger node, and the narrow traits the claim
//! workflow consumes so tests can substitute scripted collaborators.

use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use spigot_common::types::{Block, TransferTransaction};
use std::time::Duration;

/// Submits completed transactions to network peers.
#[async_trait]
pub trait RelayGateway: Send + Sync {
    /// `false` means the peers rejected the transaction.
    async fn relay(&self, tx: &TransferTransaction) -> FaucetResult<bool>;
}

/// Read-only view of the ledger: chain height and block retrieval.
#[async_trait]
pub trait ChainView: Send + Sync {
    async fn block_height(&self) -> FaucetResult<u64>;
    async fn fetch_block(&self, index: u64) -> FaucetResult<Option<Block>>;
}

/// RPC client for interacting with the ledger node.
pub struct ChainRpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl ChainRpcClient {
    /// Every call is bounded by `timeout`; a timed-out relay surfaces as an
    /// RPC error and the workflow treats it as a failure, never partial
    /// state.
    pub fn new(rpc_url: String, timeout: Duration) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaucetError::Internal(e.to_string()))?;
        Ok(Self { rpc_url, client })
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> FaucetResult<serde_json::Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FaucetError::Rpc(format!("Request failed: {}", e)))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FaucetError::Rpc(format!("Invalid response: {}", e)))?;

        if let Some(error) = json.get("error") {
            return Err(FaucetError::Rpc(error.to_string()));
        }

        Ok(json
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ChainView for ChainRpcClient {
    async fn block_height(&self) -> FaucetResult<u64> {
        let result = self.call("getblockcount", serde_json::json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| FaucetError::Rpc(format!("Invalid block count: {}", result)))
    }

    async fn fetch_block(&self, index: u64) -> FaucetResult<Option<Block>> {
        let result = self.call("getblock", serde_json::json!([index])).await?;
        if result.is_null() {
            return Ok(None);
        }
        let block =
            serde_json::from_value(result).map_err(|e| FaucetError::Rpc(e.to_string()))?;
        Ok(Some(block))
    }
}

#[async_trait]
impl RelayGateway for ChainRpcClient {
    async fn relay(&self, tx: &TransferTransaction) -> FaucetResult<bool> {
        let raw = bincode::serialize(tx).map_err(|e| FaucetError::Internal(e.to_string()))?;
        let result = self
            .call("relaytransaction", serde_json::json!([hex::encode(raw)]))
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}
