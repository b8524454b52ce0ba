//! Aragon DAO apps

use alloy_primitives::{b256, Address, Bytes, B256, U256};
use alloy_sol_types::sol;
use lido_core::{keccak256, CallScriptItem};

sol! {
    interface IAcl {
        function createPermission(address entity, address app, bytes32 role, address manager) external;
        function grantPermission(address entity, address app, bytes32 role) external;
        function grantPermissionP(address entity, address app, bytes32 role, uint256[] params) external;
        function revokePermission(address entity, address app, bytes32 role) external;
        function setPermissionManager(address newManager, address app, bytes32 role) external;
        function removePermissionManager(address app, bytes32 role) external;
        function hasPermission(address entity, address app, bytes32 role) external view returns (bool);
        function getPermissionManager(address app, bytes32 role) external view returns (address);
    }

    interface IKernel {
        function setApp(bytes32 namespace, bytes32 appId, address app) external;
        function getApp(bytes32 namespace, bytes32 appId) external view returns (address);
    }

    interface IRepo {
        function newVersion(uint16[3] semanticVersion, address contractAddress, bytes contentURI) external;
        function getLatest() external view;
    }

    interface IAgent {
        function forward(bytes evmScript) external;
        function execute(address target, uint256 ethValue, bytes data) external;
    }

    interface IVoting {
        function newVote(bytes executionScript, string metadata, bool castVote, bool executesIfDecided) external returns (uint256 voteId);
        function vote(uint256 voteId, bool _supports, bool executesIfDecided) external;
        function executeVote(uint256 voteId) external;
        function unsafelyChangeVoteTime(uint64 voteTime) external;
        function voteTime() external view returns (uint64);
        function votesLength() external view returns (uint256);
        function canExecute(uint256 voteId) external view returns (bool);
    }

    interface IFinance {
        function newImmediatePayment(address token, address receiver, uint256 amount, string _reference) external;
    }
}

/// `StartVote(uint256,address,string)`, the vote id is the first indexed topic
pub const START_VOTE_TOPIC: B256 =
    b256!("4d72fe0577a3a3f7da968d7b892779dde102519c25527b29cf7054f245c791b9");

contract!(
    /// Aragon access control list
    Acl
);

contract!(
    /// Aragon kernel, the registry of app implementations
    Kernel
);

contract!(
    /// Aragon package manager repository
    Repo
);

contract!(
    /// DAO treasury and executor
    Agent
);

contract!(
    /// LDO token voting
    Voting
);

contract!(
    /// LDO token manager, the forwarder allowed to open votes
    TokenManager
);

contract!(
    /// Treasury payments
    Finance
);

impl Acl {
    pub fn create_permission(&self, entity: Address, app: Address, role: B256, manager: Address) -> CallScriptItem {
        self.call(IAcl::createPermissionCall { entity, app, role, manager })
    }

    pub fn grant_permission(&self, entity: Address, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::grantPermissionCall { entity, app, role })
    }

    /// Grant with parameters, see [`lido_core::permission_params`]
    pub fn grant_permission_p(&self, entity: Address, app: Address, role: B256, params: &[U256]) -> CallScriptItem {
        self.call(IAcl::grantPermissionPCall {
            entity,
            app,
            role,
            params: params.to_vec(),
        })
    }

    pub fn revoke_permission(&self, entity: Address, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::revokePermissionCall { entity, app, role })
    }

    pub fn set_permission_manager(&self, new_manager: Address, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::setPermissionManagerCall {
            newManager: new_manager,
            app,
            role,
        })
    }

    pub fn remove_permission_manager(&self, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::removePermissionManagerCall { app, role })
    }

    pub fn has_permission(&self, entity: Address, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::hasPermissionCall { entity, app, role })
    }

    pub fn get_permission_manager(&self, app: Address, role: B256) -> CallScriptItem {
        self.call(IAcl::getPermissionManagerCall { app, role })
    }
}

impl Kernel {
    /// `APP_BASES_NAMESPACE()` of the kernel
    pub fn app_bases_namespace() -> B256 {
        keccak256("base")
    }

    pub fn set_app(&self, namespace: B256, app_id: B256, app: Address) -> CallScriptItem {
        self.call(IKernel::setAppCall { namespace, appId: app_id, app })
    }

    pub fn get_app(&self, namespace: B256, app_id: B256) -> CallScriptItem {
        self.call(IKernel::getAppCall { namespace, appId: app_id })
    }
}

impl Repo {
    /// Publish `version` (`[major, minor, patch]`) pointing to `contract`
    pub fn new_version(&self, version: [u16; 3], contract: Address, content_uri: &[u8]) -> CallScriptItem {
        self.call(IRepo::newVersionCall {
            semanticVersion: version,
            contractAddress: contract,
            contentURI: Bytes::copy_from_slice(content_uri),
        })
    }

    pub fn get_latest(&self) -> CallScriptItem {
        self.call(IRepo::getLatestCall {})
    }
}

impl Agent {
    pub fn forward(&self, script: &[u8]) -> CallScriptItem {
        self.call(IAgent::forwardCall {
            evmScript: Bytes::copy_from_slice(script),
        })
    }

    pub fn execute(&self, target: Address, eth_value: U256, data: &[u8]) -> CallScriptItem {
        self.call(IAgent::executeCall {
            target,
            ethValue: eth_value,
            data: Bytes::copy_from_slice(data),
        })
    }
}

impl Voting {
    pub fn new_vote(&self, script: &[u8], metadata: &str, cast_vote: bool, executes_if_decided: bool) -> CallScriptItem {
        self.call(IVoting::newVoteCall {
            executionScript: Bytes::copy_from_slice(script),
            metadata: metadata.to_string(),
            castVote: cast_vote,
            executesIfDecided: executes_if_decided,
        })
    }

    pub fn vote(&self, vote_id: U256, supports: bool, executes_if_decided: bool) -> CallScriptItem {
        self.call(IVoting::voteCall {
            voteId: vote_id,
            _supports: supports,
            executesIfDecided: executes_if_decided,
        })
    }

    pub fn execute_vote(&self, vote_id: U256) -> CallScriptItem {
        self.call(IVoting::executeVoteCall { voteId: vote_id })
    }

    pub fn unsafely_change_vote_time(&self, vote_time: u64) -> CallScriptItem {
        self.call(IVoting::unsafelyChangeVoteTimeCall { voteTime: vote_time })
    }

    pub fn vote_time(&self) -> CallScriptItem {
        self.call(IVoting::voteTimeCall {})
    }

    pub fn votes_length(&self) -> CallScriptItem {
        self.call(IVoting::votesLengthCall {})
    }

    pub fn can_execute(&self, vote_id: U256) -> CallScriptItem {
        self.call(IVoting::canExecuteCall { voteId: vote_id })
    }
}

impl TokenManager {
    pub fn forward(&self, script: &[u8]) -> CallScriptItem {
        self.call(IAgent::forwardCall {
            evmScript: Bytes::copy_from_slice(script),
        })
    }
}

impl Finance {
    pub fn new_immediate_payment(&self, token: Address, receiver: Address, amount: U256, reference: &str) -> CallScriptItem {
        self.call(IFinance::newImmediatePaymentCall {
            token,
            receiver,
            amount,
            _reference: reference.to_string(),
        })
    }
}
