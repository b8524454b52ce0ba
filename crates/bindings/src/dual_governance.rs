//! Dual Governance and its Emergency Protected Timelock

use alloy_primitives::{aliases::U96, b256, Address, Bytes, B256, U256};
use alloy_sol_types::sol;
use lido_core::CallScriptItem;
use serde::{Deserialize, Serialize};

sol! {
    /// One external call of a proposal
    #[derive(Debug, PartialEq, Eq)]
    struct ProposalCall {
        address target;
        uint96 value;
        bytes payload;
    }

    interface IDualGovernance {
        function submitProposal(ProposalCall[] calls, string metadata) external returns (uint256 proposalId);
        function scheduleProposal(uint256 proposalId) external;
        function activateNextState() external;
        function canScheduleProposal(uint256 proposalId) external view returns (bool);
        function getStateDetails() external view;
        function getConfigProvider() external view returns (address);
    }

    interface IEmergencyProtectedTimelock {
        function execute(uint256 proposalId) external;
        function getProposalDetails(uint256 proposalId) external view;
        function getAfterSubmitDelay() external view returns (uint32);
        function getAfterScheduleDelay() external view returns (uint32);
    }

    interface IDualGovernanceConfigProvider {
        function getDualGovernanceConfig() external view;
    }
}

/// `ProposalSubmitted(uint256,address,(address,uint96,bytes)[],string)`
pub const PROPOSAL_SUBMITTED_TOPIC: B256 =
    b256!("df2860831525a9d9cb0f1e057740ad43c8d06a0503e47bfbdd679d13ba313c04");

contract!(
    /// Dual Governance entry point
    DualGovernance
);

contract!(
    /// Timelock holding submitted proposals
    EmergencyProtectedTimelock
);

contract!(
    /// Source of the Dual Governance timing configuration
    DualGovernanceConfigProvider
);

/// Proposal status in the timelock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProposalStatus {
    NotExist = 0,
    Submitted = 1,
    Scheduled = 2,
    Executed = 3,
    Cancelled = 4,
}

impl ProposalStatus {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotExist),
            1 => Some(Self::Submitted),
            2 => Some(Self::Scheduled),
            3 => Some(Self::Executed),
            4 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Dual Governance state machine state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DualGovernanceState {
    Normal = 1,
    VetoSignalling = 2,
    VetoSignallingDeactivation = 3,
    VetoCooldown = 4,
    RageQuit = 5,
}

impl DualGovernanceState {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Normal),
            2 => Some(Self::VetoSignalling),
            3 => Some(Self::VetoSignallingDeactivation),
            4 => Some(Self::VetoCooldown),
            5 => Some(Self::RageQuit),
            _ => None,
        }
    }
}

impl ProposalCall {
    pub const fn new(target: Address, payload: Bytes) -> Self {
        Self {
            target,
            value: U96::ZERO,
            payload,
        }
    }
}

impl From<CallScriptItem> for ProposalCall {
    fn from(item: CallScriptItem) -> Self {
        Self::new(item.target, item.calldata)
    }
}

impl DualGovernance {
    pub fn submit_proposal(&self, calls: &[ProposalCall], metadata: &str) -> CallScriptItem {
        self.call(IDualGovernance::submitProposalCall {
            calls: calls.to_vec(),
            metadata: metadata.to_string(),
        })
    }

    pub fn schedule_proposal(&self, proposal_id: U256) -> CallScriptItem {
        self.call(IDualGovernance::scheduleProposalCall { proposalId: proposal_id })
    }

    pub fn activate_next_state(&self) -> CallScriptItem {
        self.call(IDualGovernance::activateNextStateCall {})
    }

    pub fn can_schedule_proposal(&self, proposal_id: U256) -> CallScriptItem {
        self.call(IDualGovernance::canScheduleProposalCall { proposalId: proposal_id })
    }

    /// `(effectiveState, persistedState, persistedStateEnteredAt,
    /// vetoSignallingActivatedAt, vetoSignallingReactivationTime,
    /// normalOrVetoCooldownExitedAt, rageQuitRound, vetoSignallingDuration)`
    pub fn get_state_details(&self) -> CallScriptItem {
        self.call(IDualGovernance::getStateDetailsCall {})
    }

    pub fn get_config_provider(&self) -> CallScriptItem {
        self.call(IDualGovernance::getConfigProviderCall {})
    }
}

impl EmergencyProtectedTimelock {
    pub fn execute(&self, proposal_id: U256) -> CallScriptItem {
        self.call(IEmergencyProtectedTimelock::executeCall { proposalId: proposal_id })
    }

    /// `(id, executor, submittedAt, scheduledAt, status)`
    pub fn get_proposal_details(&self, proposal_id: U256) -> CallScriptItem {
        self.call(IEmergencyProtectedTimelock::getProposalDetailsCall { proposalId: proposal_id })
    }

    pub fn get_after_submit_delay(&self) -> CallScriptItem {
        self.call(IEmergencyProtectedTimelock::getAfterSubmitDelayCall {})
    }

    pub fn get_after_schedule_delay(&self) -> CallScriptItem {
        self.call(IEmergencyProtectedTimelock::getAfterScheduleDelayCall {})
    }
}

impl DualGovernanceConfigProvider {
    /// Word 4 of the result is the veto signalling deactivation max duration
    pub fn get_dual_governance_config(&self) -> CallScriptItem {
        self.call(IDualGovernanceConfigProvider::getDualGovernanceConfigCall {})
    }
}
