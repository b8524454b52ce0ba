//! Oracle report data
//!
//! Accounting and exit bus reports are submitted as a single tuple; committee
//! members vote on `keccak256(abi.encode(report))` through HashConsensus.

use alloy_primitives::{FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};

use crate::hash::keccak256;
use crate::types::pow10;

sol! {
    /// `AccountingOracle.ReportData`, the consensus layer balance is in gwei
    #[derive(Debug, Default, PartialEq, Eq)]
    struct AccountingReport {
        uint256 consensusVersion;
        uint256 refSlot;
        uint256 numValidators;
        uint256 clBalanceGwei;
        uint256[] stakingModuleIdsWithNewlyExitedValidators;
        uint256[] numExitedValidatorsByStakingModule;
        uint256 withdrawalVaultBalance;
        uint256 elRewardsVaultBalance;
        uint256 sharesRequestedToBurn;
        uint256[] withdrawalFinalizationBatches;
        uint256 simulatedShareRate;
        bool isBunkerMode;
        uint256 extraDataFormat;
        bytes32 extraDataHash;
        uint256 extraDataItemsCount;
    }

    /// `ValidatorsExitBusOracle.ReportData`
    #[derive(Debug, Default, PartialEq, Eq)]
    struct ExitBusReport {
        uint256 consensusVersion;
        uint256 refSlot;
        uint256 requestsCount;
        uint256 dataFormat;
        bytes data;
    }

    /// Main phase submission of `AccountingOracle`
    interface IAccountingReportSubmitter {
        function submitReportData(AccountingReport data, uint256 contractVersion) external;
    }

    /// Report submission of `ValidatorsExitBusOracle`
    interface IExitBusReportSubmitter {
        function submitReportData(ExitBusReport data, uint256 contractVersion) external;
    }
}

/// Precision of `simulatedShareRate`
pub fn share_rate_precision() -> U256 {
    pow10(27)
}

impl AccountingReport {
    /// Report with the consensus layer balance given in wei
    pub fn new(consensus_version: U256, ref_slot: U256, num_validators: U256, cl_balance_wei: U256) -> Self {
        Self {
            consensusVersion: consensus_version,
            refSlot: ref_slot,
            numValidators: num_validators,
            clBalanceGwei: cl_balance_wei / pow10(9),
            ..Default::default()
        }
    }

    /// Hash submitted to HashConsensus
    pub fn hash(&self) -> B256 {
        keccak256(self.abi_encode())
    }
}

/// Packed list of exit requests
pub const EXIT_DATA_FORMAT_LIST: u64 = 1;

/// Validator asked to exit by the exit bus oracle
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitRequest {
    /// Packed into 3 bytes
    pub module_id: u32,
    /// Packed into 5 bytes
    pub node_operator_id: u64,
    pub validator_index: u64,
    pub pubkey: FixedBytes<48>,
}

impl ExitRequest {
    /// `moduleId | nodeOpId | validatorIndex | pubkey`, 64 bytes
    pub fn pack(&self) -> [u8; 64] {
        let mut packed = [0u8; 64];
        packed[..3].copy_from_slice(&self.module_id.to_be_bytes()[1..]);
        packed[3..8].copy_from_slice(&self.node_operator_id.to_be_bytes()[3..]);
        packed[8..16].copy_from_slice(&self.validator_index.to_be_bytes());
        packed[16..].copy_from_slice(self.pubkey.as_slice());
        packed
    }
}

impl ExitBusReport {
    /// Report in the list format; the oracle accepts requests sorted by
    /// module, node operator and validator index only
    pub fn from_requests(consensus_version: U256, ref_slot: U256, requests: &[ExitRequest]) -> Self {
        let mut sorted = requests.to_vec();
        sorted.sort_by_key(|r| (r.module_id, r.node_operator_id, r.validator_index));
        Self {
            consensusVersion: consensus_version,
            refSlot: ref_slot,
            requestsCount: U256::from(sorted.len()),
            dataFormat: U256::from(EXIT_DATA_FORMAT_LIST),
            data: sorted.iter().flat_map(|r| r.pack()).collect::<Vec<u8>>().into(),
        }
    }

    /// Hash submitted to HashConsensus
    pub fn hash(&self) -> B256 {
        keccak256(self.abi_encode())
    }
}
