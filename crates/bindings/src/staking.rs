//! Staking router, node operators registry and the oracles

use alloy_primitives::{Bytes, B256, U256};
use alloy_sol_types::sol;
use lido_core::{
    oracle_report::{AccountingReport, ExitBusReport, IAccountingReportSubmitter, IExitBusReportSubmitter},
    CallScriptItem,
};

sol! {
    interface IStakingRouter {
        function updateStakingModule(
            uint256 stakingModuleId,
            uint256 stakeShareLimit,
            uint256 priorityExitShareThreshold,
            uint256 stakingModuleFee,
            uint256 treasuryFee,
            uint256 maxDepositsPerBlock,
            uint256 minDepositBlockDistance
        ) external;
        function getStakingModule(uint256 stakingModuleId) external view;
    }

    interface INodeOperatorsRegistry {
        function setNodeOperatorStakingLimit(uint256 nodeOperatorId, uint64 vettedSigningKeysCount) external;
        function removeSigningKey(uint256 nodeOperatorId, uint256 index) external;
    }

    interface IAccountingOracle {
        function submitReportExtraDataEmpty() external;
        function submitReportExtraDataList(bytes data) external;
        function getConsensusVersion() external view returns (uint256);
        function getContractVersion() external view returns (uint256);
        function getConsensusContract() external view returns (address);
        function getProcessingState() external view;
    }

    interface IValidatorsExitBusOracle {
        function getConsensusVersion() external view returns (uint256);
        function getContractVersion() external view returns (uint256);
        function getConsensusContract() external view returns (address);
        function getProcessingState() external view;
        function getLastRequestedValidatorIndices(uint256 moduleId, uint256[] nodeOpIds) external view returns (int256[]);
    }

    interface IHashConsensus {
        function submitReport(uint256 slot, bytes32 report, uint256 consensusVersion) external;
        function getFastLaneMembers() external view;
        function getConsensusState() external view;
        function getChainConfig() external view returns (uint256 slotsPerEpoch, uint256 secondsPerSlot, uint256 genesisTime);
        function getCurrentFrame() external view returns (uint256 refSlot, uint256 reportProcessingDeadlineSlot);
        function getFrameConfig() external view returns (uint256 initialEpoch, uint256 epochsPerFrame, uint256 fastLaneLengthSlots);
    }
}

contract!(StakingRouter);

contract!(
    /// Curated and Simple DVT modules
    NodeOperatorsRegistry
);

contract!(AccountingOracle);

contract!(
    /// Validator exit requests oracle
    ValidatorsExitBusOracle
);

contract!(
    /// Oracle committee consensus over report hashes
    HashConsensus
);

/// New parameters of a staking module
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StakingModuleParams {
    pub stake_share_limit: u64,
    pub priority_exit_share_threshold: u64,
    pub staking_module_fee: u64,
    pub treasury_fee: u64,
    pub max_deposits_per_block: u64,
    pub min_deposit_block_distance: u64,
}

impl StakingRouter {
    pub fn update_staking_module(&self, module_id: u64, params: &StakingModuleParams) -> CallScriptItem {
        self.call(IStakingRouter::updateStakingModuleCall {
            stakingModuleId: U256::from(module_id),
            stakeShareLimit: U256::from(params.stake_share_limit),
            priorityExitShareThreshold: U256::from(params.priority_exit_share_threshold),
            stakingModuleFee: U256::from(params.staking_module_fee),
            treasuryFee: U256::from(params.treasury_fee),
            maxDepositsPerBlock: U256::from(params.max_deposits_per_block),
            minDepositBlockDistance: U256::from(params.min_deposit_block_distance),
        })
    }

    pub fn get_staking_module(&self, module_id: u64) -> CallScriptItem {
        self.call(IStakingRouter::getStakingModuleCall {
            stakingModuleId: U256::from(module_id),
        })
    }
}

impl NodeOperatorsRegistry {
    pub fn set_node_operator_staking_limit(&self, node_operator_id: u64, limit: u64) -> CallScriptItem {
        self.call(INodeOperatorsRegistry::setNodeOperatorStakingLimitCall {
            nodeOperatorId: U256::from(node_operator_id),
            vettedSigningKeysCount: limit,
        })
    }

    pub fn remove_signing_key(&self, node_operator_id: u64, index: u64) -> CallScriptItem {
        self.call(INodeOperatorsRegistry::removeSigningKeyCall {
            nodeOperatorId: U256::from(node_operator_id),
            index: U256::from(index),
        })
    }
}

impl AccountingOracle {
    pub fn submit_report_data(&self, report: &AccountingReport, contract_version: U256) -> CallScriptItem {
        self.call(IAccountingReportSubmitter::submitReportDataCall {
            data: report.clone(),
            contractVersion: contract_version,
        })
    }

    pub fn submit_report_extra_data_empty(&self) -> CallScriptItem {
        self.call(IAccountingOracle::submitReportExtraDataEmptyCall {})
    }

    pub fn submit_report_extra_data_list(&self, data: &[u8]) -> CallScriptItem {
        self.call(IAccountingOracle::submitReportExtraDataListCall {
            data: Bytes::copy_from_slice(data),
        })
    }

    pub fn get_consensus_version(&self) -> CallScriptItem {
        self.call(IAccountingOracle::getConsensusVersionCall {})
    }

    pub fn get_contract_version(&self) -> CallScriptItem {
        self.call(IAccountingOracle::getContractVersionCall {})
    }

    pub fn get_consensus_contract(&self) -> CallScriptItem {
        self.call(IAccountingOracle::getConsensusContractCall {})
    }

    /// `(currentFrameRefSlot, processingDeadlineTime, mainDataHash,
    /// mainDataSubmitted, extraDataHash, extraDataFormat, extraDataSubmitted,
    /// extraDataItemsCount, extraDataItemsSubmitted)`
    pub fn get_processing_state(&self) -> CallScriptItem {
        self.call(IAccountingOracle::getProcessingStateCall {})
    }
}

impl ValidatorsExitBusOracle {
    pub fn submit_report_data(&self, report: &ExitBusReport, contract_version: U256) -> CallScriptItem {
        self.call(IExitBusReportSubmitter::submitReportDataCall {
            data: report.clone(),
            contractVersion: contract_version,
        })
    }

    pub fn get_consensus_version(&self) -> CallScriptItem {
        self.call(IValidatorsExitBusOracle::getConsensusVersionCall {})
    }

    pub fn get_contract_version(&self) -> CallScriptItem {
        self.call(IValidatorsExitBusOracle::getContractVersionCall {})
    }

    pub fn get_consensus_contract(&self) -> CallScriptItem {
        self.call(IValidatorsExitBusOracle::getConsensusContractCall {})
    }

    /// `(currentFrameRefSlot, processingDeadlineTime, dataHash,
    /// dataSubmitted, dataFormat, requestsCount, requestsSubmitted)`
    pub fn get_processing_state(&self) -> CallScriptItem {
        self.call(IValidatorsExitBusOracle::getProcessingStateCall {})
    }

    pub fn get_last_requested_validator_indices(&self, module_id: u64, node_operator_ids: &[u64]) -> CallScriptItem {
        self.call(IValidatorsExitBusOracle::getLastRequestedValidatorIndicesCall {
            moduleId: U256::from(module_id),
            nodeOpIds: node_operator_ids.iter().map(|id| U256::from(*id)).collect(),
        })
    }
}

impl HashConsensus {
    pub fn submit_report(&self, slot: U256, report_hash: B256, consensus_version: U256) -> CallScriptItem {
        self.call(IHashConsensus::submitReportCall {
            slot,
            report: report_hash,
            consensusVersion: consensus_version,
        })
    }

    pub fn get_fast_lane_members(&self) -> CallScriptItem {
        self.call(IHashConsensus::getFastLaneMembersCall {})
    }

    /// `(refSlot, consensusReport, isReportProcessing)`
    pub fn get_consensus_state(&self) -> CallScriptItem {
        self.call(IHashConsensus::getConsensusStateCall {})
    }

    /// `(slotsPerEpoch, secondsPerSlot, genesisTime)`
    pub fn get_chain_config(&self) -> CallScriptItem {
        self.call(IHashConsensus::getChainConfigCall {})
    }

    /// `(refSlot, reportProcessingDeadlineSlot)`
    pub fn get_current_frame(&self) -> CallScriptItem {
        self.call(IHashConsensus::getCurrentFrameCall {})
    }

    /// `(initialEpoch, epochsPerFrame, fastLaneLengthSlots)`
    pub fn get_frame_config(&self) -> CallScriptItem {
        self.call(IHashConsensus::getFrameConfigCall {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_update_staking_module() {
        let router = StakingRouter::new(Address::repeat_byte(0x5e));
        let params = StakingModuleParams {
            stake_share_limit: 410,
            priority_exit_share_threshold: 444,
            staking_module_fee: 800,
            treasury_fee: 200,
            max_deposits_per_block: 150,
            min_deposit_block_distance: 25,
        };
        let item = router.update_staking_module(2, &params);
        assert_eq!(hex::encode(item.selector().unwrap()), "77189583");
        assert_eq!(item.calldata.len(), 4 + 7 * 32);
        assert_eq!(item.calldata[4 + 31], 2);
        assert_eq!(U256::from_be_slice(&item.calldata[36..68]), U256::from(410u64));
    }

    #[test]
    fn test_submit_report() {
        let consensus = HashConsensus::new(Address::ZERO);
        let item = consensus.submit_report(U256::from(100u64), B256::repeat_byte(0xab), U256::from(3u64));
        assert_eq!(hex::encode(item.selector().unwrap()), "e33a8d39");
    }

    #[test]
    fn test_submit_report_data_decodes() {
        let oracle = AccountingOracle::new(Address::ZERO);
        let report = AccountingReport::new(U256::from(2u64), U256::from(7200u64), U256::from(10u64), U256::from(32_000_000_000u64));
        let item = oracle.submit_report_data(&report, U256::from(2u64));
        assert_eq!(hex::encode(item.selector().unwrap()), "fc7377cd");
        let args = IAccountingReportSubmitter::submitReportDataCall::abi_decode(&item.calldata).unwrap();
        assert_eq!(args.data, report);
        assert_eq!(args.contractVersion, U256::from(2u64));
    }

    #[test]
    fn test_exit_bus_submit_report_data() {
        let oracle = ValidatorsExitBusOracle::new(Address::ZERO);
        let report = ExitBusReport::from_requests(U256::from(4u64), U256::from(7200u64), &[]);
        let item = oracle.submit_report_data(&report, U256::from(2u64));
        assert_eq!(
            item.selector().unwrap(),
            lido_core::selector("submitReportData((uint256,uint256,uint256,uint256,bytes),uint256)")
        );
        let args = IExitBusReportSubmitter::submitReportDataCall::abi_decode(&item.calldata).unwrap();
        assert_eq!(args.data, report);
    }

    #[test]
    fn test_last_requested_validator_indices() {
        let oracle = ValidatorsExitBusOracle::new(Address::ZERO);
        let item = oracle.get_last_requested_validator_indices(1, &[3, 5]);
        let args = IValidatorsExitBusOracle::getLastRequestedValidatorIndicesCall::abi_decode(&item.calldata).unwrap();
        assert_eq!(args.moduleId, U256::from(1u64));
        assert_eq!(args.nodeOpIds, vec![U256::from(3u64), U256::from(5u64)]);
    }
}
