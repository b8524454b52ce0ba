//! Ethereum JSON-RPC access
//!
//! Transactions are sent with `eth_sendTransaction` from unlocked or
//! impersonated accounts; nothing is signed locally. Time travel and
//! impersonation use the Hardhat/Anvil fork methods.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, bail, ensure, Context, Result};
use async_trait::async_trait;
use lido_core::{abi, CallScriptItem, DynSolValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const RECEIPT_POLL_ATTEMPTS: u32 = 30;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const GWEI: u64 = 1_000_000_000;

/// Sender and fee settings of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    pub from: Address,
    pub priority_fee_gwei: Option<u64>,
    pub max_fee_gwei: Option<u64>,
}

impl From<Address> for TxParams {
    fn from(from: Address) -> Self {
        Self {
            from,
            priority_fee_gwei: None,
            max_fee_gwei: None,
        }
    }
}

/// Event log
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub status: bool,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Logs with `topic` as their event signature
    pub fn logs_with_topic(&self, topic: B256) -> impl Iterator<Item = &Log> {
        self.logs.iter().filter(move |log| log.topics.first() == Some(&topic))
    }
}

/// The node operations vote orchestration relies on
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// `eth_call` against the latest block
    async fn call(&self, item: &CallScriptItem) -> Result<Bytes>;

    /// `eth_call` with `msg.sender` set to `from`, for simulating
    /// permissioned methods without sending a transaction
    async fn call_from(&self, from: Address, item: &CallScriptItem) -> Result<Bytes>;

    /// Submit a transaction, returning its hash
    async fn send_transaction(&self, params: &TxParams, item: &CallScriptItem) -> Result<B256>;

    /// `None` while the transaction is pending
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>>;

    /// Timestamp of the latest block
    async fn chain_time(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    /// Advance chain time and mine a block carrying it
    async fn sleep(&self, seconds: u64) -> Result<()>;

    async fn mine(&self) -> Result<()>;

    async fn impersonate(&self, account: Address) -> Result<()>;

    async fn balance(&self, account: Address) -> Result<U256>;

    async fn set_balance(&self, account: Address, wei: U256) -> Result<()>;

    async fn snapshot(&self) -> Result<U256>;

    async fn revert(&self, snapshot_id: U256) -> Result<bool>;
}

/// [`EthRpc`] over HTTP
#[derive(Clone, Debug)]
pub struct HttpRpc {
    url: String,
    client: reqwest::Client,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{method} request to {} failed", self.url))?
            .json::<Value>()
            .await?;

        if let Some(error) = response.get("error") {
            bail!("{method} failed: {error}");
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("No result in response"))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    status: Option<String>,
    block_number: Option<String>,
    #[serde(default)]
    logs: Vec<Log>,
}

fn parse_quantity(value: &Value) -> Result<u64> {
    let s = value.as_str().ok_or_else(|| anyhow!("Expected hex quantity, got {value}"))?;
    Ok(u64::from_str_radix(s.trim_start_matches("0x"), 16)?)
}

/// `maxFeePerGas` style hex quantity of a gwei amount
fn gwei_quantity(gwei: u64) -> String {
    format!("{:#x}", U256::from(gwei) * U256::from(GWEI))
}

impl HttpRpc {
    async fn eth_call(&self, request: Value) -> Result<Bytes> {
        let result = self.rpc_call("eth_call", json!([request, "latest"])).await?;
        let s = result.as_str().ok_or_else(|| anyhow!("Invalid eth_call result"))?;
        Ok(hex::decode(s.trim_start_matches("0x"))?.into())
    }
}

#[async_trait]
impl EthRpc for HttpRpc {
    async fn call(&self, item: &CallScriptItem) -> Result<Bytes> {
        self.eth_call(json!({
            "to": item.target,
            "data": format!("0x{}", hex::encode(&item.calldata)),
        }))
        .await
    }

    async fn call_from(&self, from: Address, item: &CallScriptItem) -> Result<Bytes> {
        self.eth_call(json!({
            "from": from,
            "to": item.target,
            "data": format!("0x{}", hex::encode(&item.calldata)),
        }))
        .await
    }

    async fn send_transaction(&self, params: &TxParams, item: &CallScriptItem) -> Result<B256> {
        let mut tx_request = json!({
            "from": params.from,
            "to": item.target,
            "data": format!("0x{}", hex::encode(&item.calldata)),
        });
        if let Some(priority_fee) = params.priority_fee_gwei {
            tx_request["maxPriorityFeePerGas"] = json!(gwei_quantity(priority_fee));
        }
        if let Some(max_fee) = params.max_fee_gwei {
            tx_request["maxFeePerGas"] = json!(gwei_quantity(max_fee));
        }

        let result = self.rpc_call("eth_sendTransaction", json!([tx_request])).await?;
        let tx_hash = result.as_str().ok_or_else(|| anyhow!("Invalid transaction hash"))?;
        Ok(tx_hash.parse()?)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        let result = self.rpc_call("eth_getTransactionReceipt", json!([tx_hash])).await?;
        if result.is_null() {
            return Ok(None);
        }

        let raw: RawReceipt = serde_json::from_value(result)?;
        let block_number = match raw.block_number {
            Some(n) => u64::from_str_radix(n.trim_start_matches("0x"), 16)?,
            None => return Ok(None),
        };
        Ok(Some(Receipt {
            tx_hash: raw.transaction_hash,
            status: raw.status.as_deref() == Some("0x1"),
            block_number,
            logs: raw.logs,
        }))
    }

    async fn chain_time(&self) -> Result<u64> {
        let block = self.rpc_call("eth_getBlockByNumber", json!(["latest", false])).await?;
        parse_quantity(&block["timestamp"])
    }

    async fn block_number(&self) -> Result<u64> {
        let result = self.rpc_call("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    async fn sleep(&self, seconds: u64) -> Result<()> {
        self.rpc_call("evm_increaseTime", json!([seconds])).await?;
        self.mine().await
    }

    async fn mine(&self) -> Result<()> {
        self.rpc_call("evm_mine", json!([])).await?;
        Ok(())
    }

    async fn impersonate(&self, account: Address) -> Result<()> {
        self.rpc_call("hardhat_impersonateAccount", json!([account])).await?;
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        let result = self.rpc_call("eth_getBalance", json!([account, "latest"])).await?;
        let balance = result.as_str().ok_or_else(|| anyhow!("Invalid balance"))?;
        Ok(balance.parse()?)
    }

    async fn set_balance(&self, account: Address, wei: U256) -> Result<()> {
        self.rpc_call("hardhat_setBalance", json!([account, format!("{wei:#x}")]))
            .await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<U256> {
        let result = self.rpc_call("evm_snapshot", json!([])).await?;
        let id = result.as_str().ok_or_else(|| anyhow!("Invalid snapshot id"))?;
        Ok(id.parse()?)
    }

    async fn revert(&self, snapshot_id: U256) -> Result<bool> {
        let result = self.rpc_call("evm_revert", json!([format!("{snapshot_id:#x}")])).await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

/// Call a view method and decode its outputs as `types`
pub async fn view(rpc: &dyn EthRpc, item: &CallScriptItem, types: &[&str]) -> Result<Vec<DynSolValue>> {
    let types = types
        .iter()
        .map(|ty| abi::parse_type(ty))
        .collect::<Result<Vec<_>, _>>()?;
    let data = rpc.call(item).await?;
    Ok(abi::decode(&types, &data)?)
}

/// Call a view method returning only static values, one word each
pub async fn view_words(rpc: &dyn EthRpc, item: &CallScriptItem) -> Result<Vec<U256>> {
    let data = rpc.call(item).await?;
    ensure!(
        data.len() % abi::WORD == 0,
        "Return data of {} is not word aligned",
        item.target
    );
    Ok(data.chunks(abi::WORD).map(U256::from_be_slice).collect())
}

/// First word of a view method's return data
pub async fn view_word(rpc: &dyn EthRpc, item: &CallScriptItem) -> Result<U256> {
    view_words(rpc, item)
        .await?
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Empty return data from {}", item.target))
}

/// Send a transaction and wait until it is mined successfully
pub async fn transact(rpc: &dyn EthRpc, params: &TxParams, item: &CallScriptItem) -> Result<Receipt> {
    let tx_hash = rpc.send_transaction(params, item).await?;
    debug!("Sent {tx_hash} from {} to {}", params.from, item.target);

    for _ in 0..RECEIPT_POLL_ATTEMPTS {
        if let Some(receipt) = rpc.transaction_receipt(tx_hash).await? {
            ensure!(receipt.status, "Transaction {tx_hash} to {} reverted", item.target);
            return Ok(receipt);
        }
        tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
    }
    bail!("Transaction {tx_hash} was not mined")
}
