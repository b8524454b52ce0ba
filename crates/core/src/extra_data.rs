//! Accounting oracle extra data
//!
//! Extra data is a chain of transactions, each holding a list of items:
//!
//! ```text
//! | 32 bytes | 3 bytes   | 2 bytes  | X bytes     |
//! | nextHash | itemIndex | itemType | itemPayload |
//!
//! itemPayload:
//! | 3 bytes  | 8 bytes      | nodeOpsCount * 8 bytes | nodeOpsCount * 16 bytes |
//! | moduleId | nodeOpsCount | nodeOperatorIds        | stuckOrExitedValsCount  |
//! ```
//!
//! `nextHash` of each transaction is the hash of the following one; the
//! last transaction links to the zero hash.

use std::collections::BTreeMap;

use alloy_primitives::B256;
use thiserror::Error;

use crate::hash::keccak256;

const ITEM_INDEX_LEN: usize = 3;
const ITEM_TYPE_LEN: usize = 2;
const MODULE_ID_LEN: usize = 3;
const NODE_OPS_COUNT_LEN: usize = 8;
const NODE_OPERATOR_ID_LEN: usize = 8;
const VALIDATORS_COUNT_LEN: usize = 16;

/// Largest value of the 3 byte item index and module id fields
pub const MAX_UINT24: usize = (1 << 24) - 1;

/// Extra data encoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtraDataError {
    #[error("item index {0} does not fit into 3 bytes")]
    ItemIndexOverflow(usize),
    #[error("staking module id {0} does not fit into 3 bytes")]
    ModuleIdOverflow(u32),
}

/// `(staking module id, node operator id)`
pub type NodeOperatorGlobalIndex = (u32, u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ItemType {
    StuckValidators = 1,
    ExitedValidators = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtraDataFormat {
    Empty = 0,
    List = 1,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemPayload {
    pub module_id: u32,
    pub node_operator_ids: Vec<u64>,
    pub validators_counts: Vec<u128>,
}

/// Encoded extra data ready for `submitReportExtraDataList`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraData {
    /// Transactions in submission order, each prefixed with the next hash
    pub transactions: Vec<Vec<u8>>,
    /// Hash of each transaction; the first one goes into the main report
    pub hashes: Vec<B256>,
    pub format: ExtraDataFormat,
    pub items_count: usize,
}

impl ExtraData {
    /// No extra data, submitted with `submitReportExtraDataEmpty`
    pub const fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            hashes: Vec::new(),
            format: ExtraDataFormat::Empty,
            items_count: 0,
        }
    }

    /// Value of `extraDataHash` in the main report
    pub fn report_hash(&self) -> B256 {
        self.hashes.first().copied().unwrap_or(B256::ZERO)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ExtraDataService;

impl ExtraDataService {
    /// Encode stuck and exited validator counts
    ///
    /// `max_items_count` bounds the items per transaction and
    /// `max_no_in_payload_count` bounds the node operators per item.
    pub fn collect(
        stuck_validators: &BTreeMap<NodeOperatorGlobalIndex, u128>,
        exited_validators: &BTreeMap<NodeOperatorGlobalIndex, u128>,
        max_items_count: usize,
        max_no_in_payload_count: usize,
    ) -> Result<ExtraData, ExtraDataError> {
        let stuck = Self::build_validators_payloads(stuck_validators, max_no_in_payload_count);
        let exited = Self::build_validators_payloads(exited_validators, max_no_in_payload_count);
        let (items_count, txs) = Self::build_extra_transactions_data(&stuck, &exited, max_items_count)?;
        let (hashes, transactions) = Self::add_hashes_to_transactions(txs);

        let format = if items_count > 0 {
            ExtraDataFormat::List
        } else {
            ExtraDataFormat::Empty
        };

        Ok(ExtraData {
            transactions,
            hashes,
            format,
            items_count,
        })
    }

    /// Group counts by module, batching operators per item
    pub fn build_validators_payloads(
        validators: &BTreeMap<NodeOperatorGlobalIndex, u128>,
        max_no_in_payload_count: usize,
    ) -> Vec<ItemPayload> {
        let mut by_module: BTreeMap<u32, Vec<(u64, u128)>> = BTreeMap::new();
        for (&(module_id, operator_id), &count) in validators {
            by_module.entry(module_id).or_default().push((operator_id, count));
        }

        let batch_size = max_no_in_payload_count.max(1);
        by_module
            .into_iter()
            .flat_map(|(module_id, operators)| {
                operators
                    .chunks(batch_size)
                    .map(|batch| ItemPayload {
                        module_id,
                        node_operator_ids: batch.iter().map(|(id, _)| *id).collect(),
                        validators_counts: batch.iter().map(|(_, count)| *count).collect(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn build_extra_transactions_data(
        stuck: &[ItemPayload],
        exited: &[ItemPayload],
        max_items_count: usize,
    ) -> Result<(usize, Vec<Vec<u8>>), ExtraDataError> {
        let all: Vec<(ItemType, &ItemPayload)> = stuck
            .iter()
            .map(|p| (ItemType::StuckValidators, p))
            .chain(exited.iter().map(|p| (ItemType::ExitedValidators, p)))
            .collect();

        let mut index = 0usize;
        let mut txs = Vec::new();
        for batch in all.chunks(max_items_count.max(1)) {
            let mut tx = Vec::new();
            for (item_type, payload) in batch {
                let module_id = payload.module_id;
                tx.extend_from_slice(&uint24(index).ok_or(ExtraDataError::ItemIndexOverflow(index))?);
                tx.extend_from_slice(&be_bytes(*item_type as u128, ITEM_TYPE_LEN));
                tx.extend_from_slice(
                    &uint24(module_id as usize).ok_or(ExtraDataError::ModuleIdOverflow(module_id))?,
                );
                tx.extend_from_slice(&be_bytes(payload.node_operator_ids.len() as u128, NODE_OPS_COUNT_LEN));
                for id in &payload.node_operator_ids {
                    tx.extend_from_slice(&be_bytes(u128::from(*id), NODE_OPERATOR_ID_LEN));
                }
                for count in &payload.validators_counts {
                    tx.extend_from_slice(&be_bytes(*count, VALIDATORS_COUNT_LEN));
                }
                index += 1;
            }
            txs.push(tx);
        }
        Ok((index, txs))
    }

    /// Prefix each transaction with the hash of the next one, back to front
    fn add_hashes_to_transactions(txs: Vec<Vec<u8>>) -> (Vec<B256>, Vec<Vec<u8>>) {
        let mut hashes = Vec::with_capacity(txs.len());
        let mut hashed = Vec::with_capacity(txs.len());
        let mut next_hash = B256::ZERO;

        for tx in txs.into_iter().rev() {
            let mut full = next_hash.to_vec();
            full.extend(tx);
            next_hash = keccak256(&full);
            hashes.push(next_hash);
            hashed.push(full);
        }

        hashes.reverse();
        hashed.reverse();
        (hashes, hashed)
    }
}

/// Item index and module id field, `None` past three bytes
fn uint24(value: usize) -> Option<Vec<u8>> {
    (value <= MAX_UINT24).then(|| be_bytes(value as u128, ITEM_INDEX_LEN))
}

/// Lowest `len` bytes of `value`, big endian
fn be_bytes(value: u128, len: usize) -> Vec<u8> {
    value.to_be_bytes()[16 - len..].to_vec()
}
