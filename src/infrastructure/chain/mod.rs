// src/infrastructure/chain/mod.rs
// Solana JSON-RPC client and ed25519 wallet signing.

pub mod wallet;

pub use wallet::Wallet;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::errors::{ExecutionError, ExecutionResult};
use crate::domain::models::lamports_to_sol;
use crate::domain::repository::ChainRepository;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            rpc_url: rpc_url.to_string(),
            request_id: AtomicU64::new(1),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> ExecutionResult<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(ExecutionError::Rpc(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecutionError::Rpc(e.to_string()))?;

        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(ExecutionError::Rpc(format!("{}: {}", method, message)));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| ExecutionError::Rpc(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl ChainRepository for SolanaRpcClient {
    async fn get_balance(&self, address: &str) -> ExecutionResult<f64> {
        let result = self.rpc_call("getBalance", json!([address])).await?;
        let lamports = result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ExecutionError::Rpc("getBalance: malformed value".to_string()))?;
        Ok(lamports_to_sol(lamports))
    }

    async fn submit_transaction(&self, signed_tx: &str) -> ExecutionResult<Option<String>> {
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([signed_tx, {"encoding": "base64", "skipPreflight": false}]),
            )
            .await?;
        Ok(result.as_str().map(|s| s.to_string()))
    }

    async fn latest_blockhash(&self) -> ExecutionResult<String> {
        let result = self.rpc_call("getLatestBlockhash", json!([])).await?;
        result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|b| b.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ExecutionError::Rpc("getLatestBlockhash: malformed value".to_string()))
    }
}
