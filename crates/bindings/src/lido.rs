//! stETH accounting: Lido, the withdrawal queue, the burner and the oracle
//! report sanity checker

use alloy_primitives::U256;
use alloy_sol_types::sol;
use lido_core::CallScriptItem;

/// Capacity of `BatchesCalculationState.batches`
pub const MAX_BATCHES_LENGTH: usize = 36;

sol! {
    /// `WithdrawalQueue.BatchesCalculationState`
    #[derive(Debug, PartialEq, Eq)]
    struct BatchesCalculationState {
        uint256 remainingEthBudget;
        bool finished;
        uint256[36] batches;
        uint256 batchesLength;
    }

    interface ILido {
        function getBeaconStat() external view returns (uint256 depositedValidators, uint256 beaconValidators, uint256 beaconBalance);
        function getBufferedEther() external view returns (uint256);
        function handleOracleReport(
            uint256 reportTimestamp,
            uint256 timeElapsed,
            uint256 clValidators,
            uint256 clBalance,
            uint256 withdrawalVaultBalance,
            uint256 elRewardsVaultBalance,
            uint256 sharesRequestedToBurn,
            uint256[] withdrawalFinalizationBatches,
            uint256 simulatedShareRate
        ) external returns (uint256[4] postRebaseAmounts);
    }

    interface IWithdrawalQueue {
        function unfinalizedStETH() external view returns (uint256);
        function calculateFinalizationBatches(
            uint256 maxShareRate,
            uint256 maxTimestamp,
            uint256 maxRequestsPerCall,
            BatchesCalculationState state
        ) external view returns (BatchesCalculationState);
    }

    interface IBurner {
        function getSharesRequestedToBurn() external view returns (uint256 coverShares, uint256 nonCoverShares);
    }

    interface IOracleReportSanityChecker {
        function getOracleReportLimits() external view;
    }
}

contract!(
    /// stETH token and the protocol entry point
    Lido
);

contract!(WithdrawalQueue);

contract!(Burner);

contract!(OracleReportSanityChecker);

impl BatchesCalculationState {
    /// Initial state for an ETH budget
    pub fn new(remaining_eth_budget: U256) -> Self {
        Self {
            remainingEthBudget: remaining_eth_budget,
            finished: false,
            batches: [U256::ZERO; MAX_BATCHES_LENGTH],
            batchesLength: U256::ZERO,
        }
    }

    /// Filled part of `batches`
    pub fn filled(&self) -> impl Iterator<Item = U256> + '_ {
        let len = usize::try_from(self.batchesLength).unwrap_or(MAX_BATCHES_LENGTH);
        self.batches.iter().copied().take(len.min(MAX_BATCHES_LENGTH))
    }
}

/// Inputs of `handleOracleReport`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OracleReportInputs {
    pub report_timestamp: U256,
    pub time_elapsed: U256,
    pub cl_validators: U256,
    pub cl_balance: U256,
    pub withdrawal_vault_balance: U256,
    pub el_rewards_vault_balance: U256,
    pub shares_requested_to_burn: U256,
    pub withdrawal_finalization_batches: Vec<U256>,
    pub simulated_share_rate: U256,
}

impl Lido {
    /// `(depositedValidators, beaconValidators, beaconBalance)`
    pub fn get_beacon_stat(&self) -> CallScriptItem {
        self.call(ILido::getBeaconStatCall {})
    }

    pub fn get_buffered_ether(&self) -> CallScriptItem {
        self.call(ILido::getBufferedEtherCall {})
    }

    /// Only the accounting oracle may call this; simulate it with its address
    /// as the sender
    pub fn handle_oracle_report(&self, inputs: &OracleReportInputs) -> CallScriptItem {
        self.call(ILido::handleOracleReportCall {
            reportTimestamp: inputs.report_timestamp,
            timeElapsed: inputs.time_elapsed,
            clValidators: inputs.cl_validators,
            clBalance: inputs.cl_balance,
            withdrawalVaultBalance: inputs.withdrawal_vault_balance,
            elRewardsVaultBalance: inputs.el_rewards_vault_balance,
            sharesRequestedToBurn: inputs.shares_requested_to_burn,
            withdrawalFinalizationBatches: inputs.withdrawal_finalization_batches.clone(),
            simulatedShareRate: inputs.simulated_share_rate,
        })
    }
}

impl WithdrawalQueue {
    pub fn unfinalized_steth(&self) -> CallScriptItem {
        self.call(IWithdrawalQueue::unfinalizedStETHCall {})
    }

    pub fn calculate_finalization_batches(
        &self,
        max_share_rate: U256,
        max_timestamp: U256,
        max_requests_per_call: U256,
        state: BatchesCalculationState,
    ) -> CallScriptItem {
        self.call(IWithdrawalQueue::calculateFinalizationBatchesCall {
            maxShareRate: max_share_rate,
            maxTimestamp: max_timestamp,
            maxRequestsPerCall: max_requests_per_call,
            state,
        })
    }
}

impl Burner {
    /// `(coverShares, nonCoverShares)`
    pub fn get_shares_requested_to_burn(&self) -> CallScriptItem {
        self.call(IBurner::getSharesRequestedToBurnCall {})
    }
}

impl OracleReportSanityChecker {
    /// Static struct of limits; word 7 is `requestTimestampMargin`
    pub fn get_oracle_report_limits(&self) -> CallScriptItem {
        self.call(IOracleReportSanityChecker::getOracleReportLimitsCall {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_selectors() {
        let a = Address::ZERO;
        let cases = [
            (Lido::new(a).get_beacon_stat(), "ae2e3538"),
            (Lido::new(a).get_buffered_ether(), "47b714e0"),
            (WithdrawalQueue::new(a).unfinalized_steth(), "d0fb84e8"),
            (Burner::new(a).get_shares_requested_to_burn(), "2a369d1a"),
            (OracleReportSanityChecker::new(a).get_oracle_report_limits(), "a3a3fd5d"),
            (Lido::new(a).handle_oracle_report(&OracleReportInputs::default()), "bac3f3c5"),
        ];
        for (item, expected) in cases {
            assert_eq!(hex::encode(item.selector().unwrap()), expected);
        }
    }

    #[test]
    fn test_handle_oracle_report_signature() {
        assert_eq!(
            ILido::handleOracleReportCall::SIGNATURE,
            "handleOracleReport(uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256[],uint256)"
        );
        let inputs = OracleReportInputs {
            cl_balance: U256::from(5u64),
            withdrawal_finalization_batches: vec![U256::from(1u64), U256::from(2u64)],
            ..Default::default()
        };
        let item = Lido::new(Address::repeat_byte(1)).handle_oracle_report(&inputs);
        let args = ILido::handleOracleReportCall::abi_decode(&item.calldata).unwrap();
        assert_eq!(args.clBalance, U256::from(5u64));
        assert_eq!(args.withdrawalFinalizationBatches, inputs.withdrawal_finalization_batches);
    }

    #[test]
    fn test_finalization_batches_state() {
        assert_eq!(
            IWithdrawalQueue::calculateFinalizationBatchesCall::SIGNATURE,
            "calculateFinalizationBatches(uint256,uint256,uint256,(uint256,bool,uint256[36],uint256))"
        );
        let mut state = BatchesCalculationState::new(U256::from(100u64));
        assert_eq!(state.filled().count(), 0);
        state.batches[0] = U256::from(7u64);
        state.batches[1] = U256::from(9u64);
        state.batchesLength = U256::from(2u64);
        assert_eq!(state.filled().collect::<Vec<_>>(), vec![U256::from(7u64), U256::from(9u64)]);

        let item = WithdrawalQueue::new(Address::ZERO).calculate_finalization_batches(
            U256::from(1u64),
            U256::from(2u64),
            U256::from(10_000u64),
            state.clone(),
        );
        let args = IWithdrawalQueue::calculateFinalizationBatchesCall::abi_decode(&item.calldata).unwrap();
        assert_eq!(args.state, state);
        // every member is static, so the state is inlined after the three words
        assert_eq!(item.calldata.len(), 4 + (3 + 1 + 1 + MAX_BATCHES_LENGTH + 1) * 32);
    }
}
