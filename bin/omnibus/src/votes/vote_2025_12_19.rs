//! Vote 2025-12-19
//!
//! 1. Grant BURN_ROLE on TokenManager to the LDO vesting contract
//! 2. Grant ISSUE_ROLE on TokenManager to the LDO vesting contract
//! 3. Grant ASSIGN_ROLE on TokenManager to the LDO vesting contract

use alloy_primitives::{address, Address};
use anyhow::Result;
use lido_bindings::{encoders::encode_permission_grant, Contracts};
use lido_host::{
    forward_voting, vote_items::build_executable_vote_items, VoteItems, VoteScript,
};

pub const VESTING_CONTRACT: Address = address!("b9d7934878b5fb9610b3fe8a5e441e8fad7e293f");

const ROLES: [&str; 3] = ["BURN_ROLE", "ISSUE_ROLE", "ASSIGN_ROLE"];

const IPFS_DESCRIPTION: &str = "Enable a dedicated vesting contract to apply vesting schedules to LDO tokens held on contributor addresses, where the contract can only remint the same amount of tokens that were previously held on the address, but under vesting.";

#[derive(Debug)]
pub struct Vote20251219;

impl VoteScript for Vote20251219 {
    fn name(&self) -> &'static str {
        "vote_2025_12_19"
    }

    fn ipfs_description(&self) -> &'static str {
        IPFS_DESCRIPTION
    }

    fn vote_items(&self, contracts: &Contracts) -> Result<VoteItems> {
        let acl = contracts.acl();
        let items = ROLES
            .iter()
            .enumerate()
            .map(|(i, role)| {
                (
                    format!(
                        "{}. Grant role {role} on TokenManager {} to the vesting contract {VESTING_CONTRACT}",
                        i + 1,
                        contracts.token_manager
                    ),
                    forward_voting(encode_permission_grant(&acl, contracts.token_manager, role, VESTING_CONTRACT)),
                )
            })
            .collect();

        Ok(build_executable_vote_items(contracts, items)?)
    }
}
