//! Vote 2025-11-17
//!
//! Dual Governance proposal:
//! 1.1. Reset the spent amount of the Easy Track TRP registry
//! 1.2. Set the TRP registry limit to 11,000,000 LDO per 12 months
//! 1.3. Raise the SDVT share limit from 400 bps to 410 bps
//!
//! Direct items:
//! 2. Transfer 508,106 MATIC from the Treasury to Lido Labs Foundation

use alloy_primitives::{address, Address, U256};
use anyhow::{Context, Result};
use lido_bindings::{
    encoders::{agent_forward, make_token_payout},
    AllowedRecipientsRegistry, Contracts, StakingModuleParams,
};
use lido_core::ether;
use lido_host::{dual_governance::submit_proposals, voting::bake_vote_items, VoteItems, VoteScript};

pub const ET_TRP_REGISTRY: Address = address!("231ac69a1a37649c6b06a71ab32ddd92158c80b8");
pub const LIDO_LABS_MS: Address = address!("95b521b4f55a447db89f6a27f951713fc2035f3f");

const SDVT_MODULE_ID: u64 = 2;
const SDVT_MODULE_PARAMS: StakingModuleParams = StakingModuleParams {
    stake_share_limit: 410,
    priority_exit_share_threshold: 444,
    staking_module_fee: 800,
    treasury_fee: 200,
    max_deposits_per_block: 150,
    min_deposit_block_distance: 25,
};

const TRP_LIMIT_LDO: u64 = 11_000_000;
const TRP_PERIOD_MONTHS: u64 = 12;
const MATIC_FOR_TRANSFER: u64 = 508_106;

const IPFS_DESCRIPTION: &str = "omni nov 2025";

const PROPOSAL_DESCRIPTION: &str = "Decrease Easy Track TRP limit and increase SDVT target share";

#[derive(Debug)]
pub struct Vote20251117;

impl VoteScript for Vote20251117 {
    fn name(&self) -> &'static str {
        "vote_2025_11_17"
    }

    fn ipfs_description(&self) -> &'static str {
        IPFS_DESCRIPTION
    }

    fn vote_items(&self, contracts: &Contracts) -> Result<VoteItems> {
        let dual_governance = contracts
            .dual_governance()
            .context("Dual Governance is not deployed on this network")?;
        let matic = contracts
            .matic_token
            .context("MATIC is not known on this network")?;

        let agent = contracts.agent();
        let trp_registry = AllowedRecipientsRegistry::new(ET_TRP_REGISTRY);

        let dg_items = vec![
            agent_forward(&agent, &[trp_registry.unsafe_set_spent_amount(U256::ZERO)])?,
            agent_forward(
                &agent,
                &[trp_registry.set_limit_parameters(ether(TRP_LIMIT_LDO), TRP_PERIOD_MONTHS)],
            )?,
            agent_forward(
                &agent,
                &[contracts
                    .staking_router()
                    .update_staking_module(SDVT_MODULE_ID, &SDVT_MODULE_PARAMS)],
            )?,
        ];
        let mut proposals = submit_proposals(&dual_governance, &[(dg_items, PROPOSAL_DESCRIPTION)]);

        let descriptions = vec![
            format!(
                "1. Submit a Dual Governance proposal to decrease the Easy Track TRP registry {ET_TRP_REGISTRY} limit and increase the SDVT (MODULE_ID = 2) share limit from 400 bps to 410 bps in Staking Router {}",
                contracts.staking_router
            ),
            format!(
                "2. Transfer 508,106 MATIC {matic} from Aragon Agent {} to Lido Labs Foundation {LIDO_LABS_MS}",
                contracts.agent
            ),
        ];
        let calls = vec![
            proposals.remove(0),
            make_token_payout(
                &contracts.finance(),
                matic,
                LIDO_LABS_MS,
                ether(MATIC_FOR_TRANSFER),
                "Transfer 508,106 MATIC from Treasury to Lido Labs Foundation multisig",
            ),
        ];

        bake_vote_items(descriptions, calls)
    }
}
