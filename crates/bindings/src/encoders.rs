//! Call script items shared by vote scripts
//!
//! Role names are hashed with [`role_id`]; a misspelled name silently yields
//! another role.

use alloy_primitives::{Address, B256, U256};
use lido_core::{
    encode_call_script,
    permission_params::{encode_permission_params, Param},
    role_id, CallScriptItem, EvmScriptError,
};

use crate::{AccessControl, Acl, Agent, Contracts, Finance, Kernel, Repo};

pub fn encode_permission_create(
    acl: &Acl,
    entity: Address,
    target_app: Address,
    permission_name: &str,
    manager: Address,
) -> CallScriptItem {
    acl.create_permission(entity, target_app, role_id(permission_name), manager)
}

pub fn encode_permission_grant(acl: &Acl, target_app: Address, permission_name: &str, grant_to: Address) -> CallScriptItem {
    acl.grant_permission(grant_to, target_app, role_id(permission_name))
}

/// Grant constrained by ACL parameters
pub fn encode_permission_grant_p(
    acl: &Acl,
    target_app: Address,
    permission_name: &str,
    grant_to: Address,
    params: &[Param],
) -> CallScriptItem {
    acl.grant_permission_p(
        grant_to,
        target_app,
        role_id(permission_name),
        &encode_permission_params(params),
    )
}

pub fn encode_permission_revoke(
    acl: &Acl,
    target_app: Address,
    permission_name: &str,
    revoke_from: Address,
) -> CallScriptItem {
    acl.revoke_permission(revoke_from, target_app, role_id(permission_name))
}

pub fn encode_permission_set_manager(
    acl: &Acl,
    target_app: Address,
    permission_name: &str,
    new_manager: Address,
) -> CallScriptItem {
    acl.set_permission_manager(new_manager, target_app, role_id(permission_name))
}

pub fn encode_oz_grant_role(contract: Address, role_name: &str, grant_to: Address) -> CallScriptItem {
    AccessControl::new(contract).grant_role(role_id(role_name), grant_to)
}

pub fn encode_oz_revoke_role(contract: Address, role_name: &str, revoke_from: Address) -> CallScriptItem {
    AccessControl::new(contract).revoke_role(role_id(role_name), revoke_from)
}

/// Point the kernel app base of `app_id` at a new implementation
pub fn update_app_implementation(kernel: &Kernel, app_id: B256, new_implementation: Address) -> CallScriptItem {
    kernel.set_app(Kernel::app_bases_namespace(), app_id, new_implementation)
}

pub fn add_implementation_to_repo(repo: &Repo, version: [u16; 3], address: Address, content_uri: &[u8]) -> CallScriptItem {
    repo.new_version(version, address, content_uri)
}

/// Wrap `items` into a single `agent.forward(script)` call
pub fn agent_forward(agent: &Agent, items: &[CallScriptItem]) -> Result<CallScriptItem, EvmScriptError> {
    Ok(agent.forward(&encode_call_script(items)?))
}

/// `agent.execute(target, value, data)` for calls that carry ETH
pub fn agent_execute(agent: &Agent, item: &CallScriptItem, eth_value: U256) -> CallScriptItem {
    agent.execute(item.target, eth_value, &item.calldata)
}

/// Treasury transfer of any token through Finance
pub fn make_token_payout(
    finance: &Finance,
    token: Address,
    target_address: Address,
    amount: U256,
    reference: &str,
) -> CallScriptItem {
    finance.new_immediate_payment(token, target_address, amount, reference)
}

pub fn make_ldo_payout(contracts: &Contracts, target_address: Address, ldo_in_wei: U256, reference: &str) -> CallScriptItem {
    make_token_payout(
        &contracts.finance(),
        contracts.ldo_token,
        target_address,
        ldo_in_wei,
        reference,
    )
}
