//! JSON-RPC chain client.
//!
//! [`Transport`] moves raw JSON-RPC requests; [`ChainClient`] layers the typed
//! `call` / `transact` / `await_receipt` primitives and the few node queries
//! the relay needs on top of it.

use alloy_sol_types::SolCall;
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::abi;
use crate::error::ChainError;
use crate::models::{Address, BlockInfo, Receipt, B256};

/// Sends one JSON-RPC request and returns its `result` member.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_raw_request(&self, method: &str, params: Vec<Value>)
        -> Result<Value, ChainError>;
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Pulls revert data out of the shapes nodes put in `error.data`: a bare hex
/// string, or an object carrying `result`/`data` hex and sometimes `reason`.
fn revert_reason(data: &Value) -> Option<String> {
    let from_hex = |v: &Value| {
        v.as_str()
            .and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
            .and_then(|bytes| abi::revert_reason(&bytes))
    };
    match data {
        Value::String(_) => from_hex(data),
        Value::Object(map) => map
            .get("reason")
            .and_then(|r| r.as_str().map(str::to_owned))
            .or_else(|| map.get("result").and_then(from_hex))
            .or_else(|| map.get("data").and_then(from_hex))
            .or_else(|| map.values().find_map(revert_reason)),
        _ => None,
    }
}

fn into_chain_error(err: RpcErrorObject) -> ChainError {
    if let Some(reason) = err.data.as_ref().and_then(revert_reason) {
        return ChainError::Reverted(reason);
    }
    if err.message.contains("revert") {
        return ChainError::Reverted(err.message);
    }
    ChainError::Rpc {
        code: err.code,
        message: err.message,
    }
}

/// Unwraps a JSON-RPC 2.0 response envelope.
pub fn parse_response(body: Value) -> Result<Value, ChainError> {
    let response: RpcResponse =
        serde_json::from_value(body).map_err(|e| ChainError::Decode(e.to_string()))?;
    if let Some(err) = response.error {
        return Err(into_chain_error(err));
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        HttpTransport {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_raw_request(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("rpc #{} {}", id, method);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Connection(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("HTTP {}: {}", status, e)))?;
        parse_response(body)
    }
}

pub fn parse_quantity(value: &Value) -> Result<u128, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("expected hex quantity, got {}", value)))?;
    let digits = s.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("bad quantity {}: {}", s, e)))
}

fn parse_u64(value: &Value) -> Result<u64, ChainError> {
    let n = parse_quantity(value)?;
    u64::try_from(n).map_err(|_| ChainError::Decode(format!("quantity {} exceeds u64", n)))
}

fn parse_data(value: &Value) -> Result<Vec<u8>, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("expected hex data, got {}", value)))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| ChainError::Decode(e.to_string()))
}

fn parse_from_str<T>(value: &Value) -> Result<T, ChainError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("expected string, got {}", value)))?
        .parse()
        .map_err(|e: T::Err| ChainError::Decode(e.to_string()))
}

fn hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

#[derive(Clone)]
pub struct ChainClient {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl ChainClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        ChainClient {
            transport,
            poll_interval,
            receipt_timeout,
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, ChainError> {
        let value = self.transport.send_raw_request(method, params).await?;
        serde_json::from_value(value).map_err(|e| ChainError::Decode(format!("{}: {}", method, e)))
    }

    /// Read-only contract call against the latest block.
    pub async fn call<C: SolCall>(
        &self,
        contract: Address,
        call: &C,
    ) -> Result<C::Return, ChainError> {
        let tx = json!({ "to": contract, "data": hex_data(&call.abi_encode()) });
        let result: Value = self.request("eth_call", vec![tx, json!("latest")]).await?;
        abi::decode_returns::<C>(&parse_data(&result)?)
    }

    /// Submits a state-changing call signed by the node's unlocked `from` account.
    pub async fn transact<C: SolCall>(
        &self,
        contract: Address,
        call: &C,
        from: Address,
    ) -> Result<B256, ChainError> {
        let tx = json!({
            "from": from,
            "to": contract,
            "data": hex_data(&call.abi_encode()),
        });
        let result: Value = self.request("eth_sendTransaction", vec![tx]).await?;
        parse_from_str(&result)
    }

    /// Polls until the transaction is mined or the wait bound runs out.
    pub async fn await_receipt(&self, hash: B256) -> Result<Receipt, ChainError> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            let receipt: Value = self
                .request("eth_getTransactionReceipt", vec![json!(hash)])
                .await?;
            if !receipt.is_null() {
                return Self::parse_receipt(hash, &receipt);
            }
            if Instant::now() >= deadline {
                warn!("gave up waiting for receipt of {}", hash);
                return Err(ChainError::Timeout(hash.to_string(), self.receipt_timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn parse_receipt(hash: B256, receipt: &Value) -> Result<Receipt, ChainError> {
        let block_number = parse_u64(&receipt["blockNumber"])?;
        if let Some(status) = receipt.get("status").filter(|s| !s.is_null()) {
            if parse_quantity(status)? == 0 {
                return Err(ChainError::Reverted(format!(
                    "transaction {} failed in block {}",
                    hash, block_number
                )));
            }
        }
        Ok(Receipt {
            transaction_hash: hash,
            block_number,
        })
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.request("eth_accounts", vec![]).await
    }

    /// Balance in wei at the latest block.
    pub async fn balance(&self, account: Address) -> Result<u128, ChainError> {
        let result: Value = self
            .request("eth_getBalance", vec![json!(account), json!("latest")])
            .await?;
        parse_quantity(&result)
    }

    pub async fn latest_block(&self) -> Result<BlockInfo, ChainError> {
        let block: Value = self
            .request("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await?;
        if block.is_null() {
            return Err(ChainError::Decode("node returned no latest block".into()));
        }
        Ok(BlockInfo {
            number: parse_u64(&block["number"])?,
            hash: parse_from_str(&block["hash"])?,
            timestamp: parse_u64(&block["timestamp"])?,
            transactions: block["transactions"].as_array().map_or(0, Vec::len),
        })
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let result: Value = self.request("eth_chainId", vec![]).await?;
        parse_u64(&result)
    }
}
