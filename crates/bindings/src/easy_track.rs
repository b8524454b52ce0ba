//! Easy Track and its allowed recipients registries

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::sol;
use lido_core::{selector, CallScriptItem};

sol! {
    interface IEasyTrack {
        function addEVMScriptFactory(address factory, bytes permissions) external;
        function removeEVMScriptFactory(address factory) external;
        function getEVMScriptFactories() external view returns (address[]);
    }

    interface IAllowedRecipientsRegistry {
        function setLimitParameters(uint256 limit, uint256 periodDurationMonths) external;
        function unsafeSetSpentAmount(uint256 spentAmount) external;
        function addRecipient(address recipient, string title) external;
        function removeRecipient(address recipient) external;
        function getLimitParameters() external view returns (uint256, uint256);
    }
}

contract!(
    /// Easy Track motions registry
    EasyTrack
);

contract!(
    /// Registry of recipients and spending limits for a top up factory
    AllowedRecipientsRegistry
);

/// Permissions blob of an EVM script factory: `(address ‖ selector)*`
///
/// Methods are given as full signatures, e.g. `newImmediatePayment(address,address,uint256,string)`.
pub fn create_permissions(methods: &[(Address, &str)]) -> Bytes {
    let mut out = Vec::with_capacity(methods.len() * 24);
    for (contract, signature) in methods {
        out.extend_from_slice(contract.as_slice());
        out.extend_from_slice(&selector(signature));
    }
    out.into()
}

impl EasyTrack {
    pub fn add_evm_script_factory(&self, factory: Address, permissions: &[u8]) -> CallScriptItem {
        self.call(IEasyTrack::addEVMScriptFactoryCall {
            factory,
            permissions: Bytes::copy_from_slice(permissions),
        })
    }

    pub fn remove_evm_script_factory(&self, factory: Address) -> CallScriptItem {
        self.call(IEasyTrack::removeEVMScriptFactoryCall { factory })
    }

    pub fn get_evm_script_factories(&self) -> CallScriptItem {
        self.call(IEasyTrack::getEVMScriptFactoriesCall {})
    }
}

impl AllowedRecipientsRegistry {
    pub fn set_limit_parameters(&self, limit: U256, period_duration_months: u64) -> CallScriptItem {
        self.call(IAllowedRecipientsRegistry::setLimitParametersCall {
            limit,
            periodDurationMonths: U256::from(period_duration_months),
        })
    }

    pub fn unsafe_set_spent_amount(&self, spent_amount: U256) -> CallScriptItem {
        self.call(IAllowedRecipientsRegistry::unsafeSetSpentAmountCall { spentAmount: spent_amount })
    }

    pub fn add_recipient(&self, recipient: Address, title: &str) -> CallScriptItem {
        self.call(IAllowedRecipientsRegistry::addRecipientCall {
            recipient,
            title: title.to_string(),
        })
    }

    pub fn remove_recipient(&self, recipient: Address) -> CallScriptItem {
        self.call(IAllowedRecipientsRegistry::removeRecipientCall { recipient })
    }

    pub fn get_limit_parameters(&self) -> CallScriptItem {
        self.call(IAllowedRecipientsRegistry::getLimitParametersCall {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_permissions_concatenates() {
        let finance = Address::repeat_byte(0xf1);
        let registry = Address::repeat_byte(0xe2);
        let permissions = create_permissions(&[
            (finance, "newImmediatePayment(address,address,uint256,string)"),
            (registry, "updateSpentAmount(uint256)"),
        ]);
        assert_eq!(permissions.len(), 48);
        assert_eq!(&permissions[..20], finance.as_slice());
        assert_eq!(hex::encode(&permissions[20..24]), "f6364846");
        assert_eq!(&permissions[24..44], registry.as_slice());
    }

    #[test]
    fn test_registry_selectors() {
        let registry = AllowedRecipientsRegistry::new(Address::ZERO);
        assert_eq!(
            hex::encode(registry.unsafe_set_spent_amount(U256::ZERO).selector().unwrap()),
            "cb6eca5b"
        );
        assert_eq!(
            hex::encode(registry.set_limit_parameters(U256::ZERO, 12).selector().unwrap()),
            "3e0bde67"
        );
        assert_eq!(
            hex::encode(EasyTrack::new(Address::ZERO).add_evm_script_factory(Address::ZERO, &[]).selector().unwrap()),
            "42f04989"
        );
    }
}
