//! OpenZeppelin `AccessControl`

use alloy_primitives::{Address, B256};
use alloy_sol_types::sol;
use lido_core::CallScriptItem;

sol! {
    interface IAccessControl {
        function grantRole(bytes32 role, address account) external;
        function revokeRole(bytes32 role, address account) external;
        function hasRole(bytes32 role, address account) external view returns (bool);
    }
}

contract!(
    /// Any contract inheriting OpenZeppelin `AccessControl`
    AccessControl
);

impl AccessControl {
    pub fn grant_role(&self, role: B256, account: Address) -> CallScriptItem {
        self.call(IAccessControl::grantRoleCall { role, account })
    }

    pub fn revoke_role(&self, role: B256, account: Address) -> CallScriptItem {
        self.call(IAccessControl::revokeRoleCall { role, account })
    }

    pub fn has_role(&self, role: B256, account: Address) -> CallScriptItem {
        self.call(IAccessControl::hasRoleCall { role, account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_role() {
        let item = AccessControl::new(Address::repeat_byte(1)).grant_role(B256::repeat_byte(2), Address::repeat_byte(3));
        assert_eq!(hex::encode(item.selector().unwrap()), "2f2ff15d");
        assert_eq!(&item.calldata[4..36], B256::repeat_byte(2).as_slice());
    }
}
