//! Contract bindings
//!
//! Calldata encoders for the deployed Lido DAO contracts. Interfaces are
//! declared with `sol!`; every binding holds the contract address and returns
//! a `CallScriptItem` ready to be put into an EVM script, a Dual Governance
//! proposal or an `eth_call`.

macro_rules! contract {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub address: alloy_primitives::Address,
        }

        impl $name {
            pub const fn new(address: alloy_primitives::Address) -> Self {
                Self { address }
            }

            fn call<C: alloy_sol_types::SolCall>(&self, call: C) -> lido_core::CallScriptItem {
                lido_core::CallScriptItem::new(self.address, call.abi_encode())
            }
        }
    };
}

pub mod access_control;
pub mod addresses;
pub mod aragon;
pub mod dual_governance;
pub mod easy_track;
pub mod encoders;
pub mod lido;
pub mod signatures;
pub mod staking;

pub use access_control::AccessControl;
pub use addresses::{Contracts, Network};
pub use aragon::{Acl, Agent, Finance, Kernel, Repo, TokenManager, Voting};
pub use dual_governance::{
    DualGovernance, DualGovernanceConfigProvider, DualGovernanceState, EmergencyProtectedTimelock,
    ProposalCall, ProposalStatus,
};
pub use easy_track::{create_permissions, AllowedRecipientsRegistry, EasyTrack};
pub use lido::{BatchesCalculationState, Burner, Lido, OracleReportInputs, OracleReportSanityChecker, WithdrawalQueue};
pub use staking::{
    AccountingOracle, HashConsensus, NodeOperatorsRegistry, StakingModuleParams, StakingRouter,
    ValidatorsExitBusOracle,
};
