//! Selector lookup for rendering call scripts

use alloy_sol_types::SolCall;
use lido_core::{abi, selector, CallScriptItem, DynSolValue};

use crate::{
    access_control::IAccessControl,
    aragon::{IAcl, IAgent, IFinance, IKernel, IRepo, IVoting},
    dual_governance::{IDualGovernance, IEmergencyProtectedTimelock},
    easy_track::{IAllowedRecipientsRegistry, IEasyTrack},
    staking::{INodeOperatorsRegistry, IStakingRouter},
};

/// Every state changing method the bindings encode
pub const KNOWN_SIGNATURES: &[&str] = &[
    // Aragon
    IAcl::createPermissionCall::SIGNATURE,
    IAcl::grantPermissionCall::SIGNATURE,
    IAcl::grantPermissionPCall::SIGNATURE,
    IAcl::revokePermissionCall::SIGNATURE,
    IAcl::setPermissionManagerCall::SIGNATURE,
    IAcl::removePermissionManagerCall::SIGNATURE,
    IKernel::setAppCall::SIGNATURE,
    IRepo::newVersionCall::SIGNATURE,
    IAgent::forwardCall::SIGNATURE,
    IAgent::executeCall::SIGNATURE,
    IVoting::newVoteCall::SIGNATURE,
    IVoting::voteCall::SIGNATURE,
    IVoting::executeVoteCall::SIGNATURE,
    IVoting::unsafelyChangeVoteTimeCall::SIGNATURE,
    IFinance::newImmediatePaymentCall::SIGNATURE,
    // OpenZeppelin
    IAccessControl::grantRoleCall::SIGNATURE,
    IAccessControl::revokeRoleCall::SIGNATURE,
    // Dual Governance
    IDualGovernance::submitProposalCall::SIGNATURE,
    IDualGovernance::scheduleProposalCall::SIGNATURE,
    IDualGovernance::activateNextStateCall::SIGNATURE,
    IEmergencyProtectedTimelock::executeCall::SIGNATURE,
    // Easy Track
    IEasyTrack::addEVMScriptFactoryCall::SIGNATURE,
    IEasyTrack::removeEVMScriptFactoryCall::SIGNATURE,
    IAllowedRecipientsRegistry::setLimitParametersCall::SIGNATURE,
    IAllowedRecipientsRegistry::unsafeSetSpentAmountCall::SIGNATURE,
    IAllowedRecipientsRegistry::addRecipientCall::SIGNATURE,
    IAllowedRecipientsRegistry::removeRecipientCall::SIGNATURE,
    // Staking
    IStakingRouter::updateStakingModuleCall::SIGNATURE,
    INodeOperatorsRegistry::setNodeOperatorStakingLimitCall::SIGNATURE,
    INodeOperatorsRegistry::removeSigningKeyCall::SIGNATURE,
];

/// Signature of the method `calldata` calls, if known
pub fn lookup(calldata: &[u8]) -> Option<&'static str> {
    let head = calldata.get(..4)?;
    KNOWN_SIGNATURES
        .iter()
        .copied()
        .find(|signature| selector(signature) == head)
}

/// Known signature and decoded arguments of a call
pub fn decode(item: &CallScriptItem) -> Option<(&'static str, Vec<DynSolValue>)> {
    let signature = lookup(&item.calldata)?;
    let args = abi::decode_call(signature, &item.calldata).ok()?;
    Some((signature, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    use crate::{Finance, Voting};

    #[test]
    fn test_all_signatures_parse() {
        for signature in KNOWN_SIGNATURES {
            assert!(abi::parse_signature(signature).is_ok(), "{signature}");
        }
    }

    #[test]
    fn test_selectors_unique() {
        let mut selectors: Vec<[u8; 4]> = KNOWN_SIGNATURES.iter().map(|s| selector(s)).collect();
        selectors.sort_unstable();
        selectors.dedup();
        assert_eq!(selectors.len(), KNOWN_SIGNATURES.len());
    }

    #[test]
    fn test_decode_known_call() {
        let item = Finance::new(Address::ZERO).new_immediate_payment(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(5u64),
            "ref",
        );
        let (signature, args) = decode(&item).unwrap();
        assert_eq!(signature, "newImmediatePayment(address,address,uint256,string)");
        assert_eq!(args.len(), 4);
        assert_eq!(args[2], DynSolValue::Uint(U256::from(5u64), 256));
        assert_eq!(args[3], DynSolValue::String("ref".to_string()));
    }

    #[test]
    fn test_unknown_selector() {
        assert!(lookup(&[0xde, 0xad, 0xbe, 0xef]).is_none());
        assert!(lookup(&[0x01]).is_none());
        assert!(decode(&Voting::new(Address::ZERO).vote_time()).is_none());
    }
}
