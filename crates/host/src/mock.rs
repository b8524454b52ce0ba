//! In-memory [`EthRpc`] for tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lido_core::{keccak256, selector, CallScriptItem};

use crate::rpc::{EthRpc, Log, Receipt, TxParams};

#[derive(Debug, Default)]
struct State {
    time: u64,
    block: u64,
    /// Queued return data per `(target, selector)`; the last entry repeats
    views: HashMap<(Address, [u8; 4]), VecDeque<Bytes>>,
    reverting: HashSet<[u8; 4]>,
    /// Logs attached to transactions calling `selector`
    logs: HashMap<[u8; 4], Vec<Log>>,
    sent: Vec<(Address, CallScriptItem)>,
    /// `eth_call`s made with an explicit sender
    calls_from: Vec<(Address, CallScriptItem)>,
    receipts: HashMap<B256, Receipt>,
    impersonated: Vec<Address>,
    balances: HashMap<Address, U256>,
    snapshots: u64,
}

#[derive(Debug, Default)]
pub(crate) struct MockRpc {
    state: Mutex<State>,
}

impl MockRpc {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_time(time: u64) -> Self {
        let rpc = Self::new();
        rpc.state.lock().unwrap().time = time;
        rpc
    }

    /// Queue the return data of `signature` on `target`
    pub(crate) fn on_call(&self, target: Address, signature: &str, data: impl Into<Bytes>) {
        self.state
            .lock()
            .unwrap()
            .views
            .entry((target, selector(signature)))
            .or_default()
            .push_back(data.into());
    }

    pub(crate) fn revert_on(&self, signature: &str) {
        self.state.lock().unwrap().reverting.insert(selector(signature));
    }

    /// Emit `log` from every transaction calling `signature`
    pub(crate) fn emit_on(&self, signature: &str, log: Log) {
        self.state
            .lock()
            .unwrap()
            .logs
            .entry(selector(signature))
            .or_default()
            .push(log);
    }

    pub(crate) fn time(&self) -> u64 {
        self.state.lock().unwrap().time
    }

    pub(crate) fn sent(&self) -> Vec<(Address, CallScriptItem)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn calls_from(&self) -> Vec<(Address, CallScriptItem)> {
        self.state.lock().unwrap().calls_from.clone()
    }

    /// Selectors of sent transactions, in order
    pub(crate) fn sent_selectors(&self) -> Vec<[u8; 4]> {
        self.sent()
            .iter()
            .filter_map(|(_, item)| item.selector())
            .collect()
    }

    pub(crate) fn impersonated(&self) -> Vec<Address> {
        self.state.lock().unwrap().impersonated.clone()
    }

    pub(crate) fn fund(&self, account: Address, wei: U256) {
        self.state.lock().unwrap().balances.insert(account, wei);
    }
}

#[async_trait]
impl EthRpc for MockRpc {
    async fn call(&self, item: &CallScriptItem) -> Result<Bytes> {
        let mut state = self.state.lock().unwrap();
        let key = (item.target, item.selector().unwrap_or_default());
        let queue = state
            .views
            .get_mut(&key)
            .ok_or_else(|| anyhow!("Unexpected call to {} with {:?}", item.target, item.calldata))?;
        if queue.len() > 1 {
            queue.pop_front().ok_or_else(|| anyhow!("empty queue"))
        } else {
            queue.front().cloned().ok_or_else(|| anyhow!("empty queue"))
        }
    }

    async fn call_from(&self, from: Address, item: &CallScriptItem) -> Result<Bytes> {
        self.state.lock().unwrap().calls_from.push((from, item.clone()));
        self.call(item).await
    }

    async fn send_transaction(&self, params: &TxParams, item: &CallScriptItem) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        state.block += 1;
        let sel = item.selector().unwrap_or_default();
        let tx_hash = keccak256((state.sent.len() as u64).to_be_bytes());
        let receipt = Receipt {
            tx_hash,
            status: !state.reverting.contains(&sel),
            block_number: state.block,
            logs: state.logs.get(&sel).cloned().unwrap_or_default(),
        };
        state.receipts.insert(tx_hash, receipt);
        state.sent.push((params.from, item.clone()));
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }

    async fn chain_time(&self) -> Result<u64> {
        Ok(self.time())
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().block)
    }

    async fn sleep(&self, seconds: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.time += seconds;
        state.block += 1;
        Ok(())
    }

    async fn mine(&self) -> Result<()> {
        self.state.lock().unwrap().block += 1;
        Ok(())
    }

    async fn impersonate(&self, account: Address) -> Result<()> {
        self.state.lock().unwrap().impersonated.push(account);
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn set_balance(&self, account: Address, wei: U256) -> Result<()> {
        self.state.lock().unwrap().balances.insert(account, wei);
        Ok(())
    }

    async fn snapshot(&self) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        state.snapshots += 1;
        Ok(U256::from(state.snapshots))
    }

    async fn revert(&self, snapshot_id: U256) -> Result<bool> {
        Ok(snapshot_id <= U256::from(self.state.lock().unwrap().snapshots))
    }
}
