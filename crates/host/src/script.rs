//! Vote scripts and the flows running them

use alloy_primitives::{address, Address, U256};
use anyhow::{bail, ensure, Context, Result};
use lido_bindings::Contracts;
use tracing::{info, warn};

use crate::config::Config;
use crate::dual_governance::DualGovernanceContracts;
use crate::fork::{impersonate_funded, pass_and_exec_dao_vote, proposal_ids_from_receipt};
use crate::ipfs::{calculate_vote_ipfs_description, upload_vote_ipfs_description};
use crate::rpc::{EthRpc, Receipt, TxParams};
use crate::voting::{confirm_vote_script, create_vote, VoteItems};

/// Account paying for the permissionless steps of a fork replay
pub const STRANGER: Address = address!("98ec059dc3adfbdd63429454aeb0c990fba4a128");

/// One DAO vote
pub trait VoteScript: Send + Sync {
    /// Identifier used on the command line
    fn name(&self) -> &'static str;

    /// Markdown text published on IPFS and linked from the vote metadata
    fn ipfs_description(&self) -> &'static str;

    /// Described calls of the vote for the given address book
    fn vote_items(&self, contracts: &Contracts) -> Result<VoteItems>;
}

/// Build, confirm and create the vote of `script`
///
/// In silent mode the description CID is only calculated and the
/// confirmation prompt is skipped. Returns `None` when the vote was not
/// confirmed.
pub async fn start_vote(
    rpc: &dyn EthRpc,
    config: &Config,
    params: &TxParams,
    script: &dyn VoteScript,
    silent: bool,
) -> Result<Option<(U256, Receipt)>> {
    let contracts = config.contracts();
    let items = script
        .vote_items(&contracts)
        .with_context(|| format!("Building items of {}", script.name()))?;

    let desc_ipfs = if silent {
        calculate_vote_ipfs_description(script.ipfs_description())
    } else {
        upload_vote_ipfs_description(&config.ipfs, script.ipfs_description()).await
    };

    if !confirm_vote_script(&items, silent, Some(&desc_ipfs))? {
        warn!("Vote {} was not confirmed", script.name());
        return Ok(None);
    }

    create_vote(rpc, &contracts, &items, params, Some(&desc_ipfs))
        .await
        .map(Some)
}

/// Create the vote on a fork, pass it and carry out its Dual Governance
/// proposals
///
/// With `revert` set the fork is rolled back to its state before the vote
/// once everything has been executed.
pub async fn run_on_fork(rpc: &dyn EthRpc, config: &Config, script: &dyn VoteScript, revert: bool) -> Result<U256> {
    if config.is_live {
        bail!("This script is for local testing only.");
    }

    let contracts = config.contracts();
    let Some(&creator) = contracts.ldo_vote_executors.first() else {
        bail!("No LDO holders known on {}", config.network);
    };
    let creator = impersonate_funded(rpc, creator).await?;
    let stranger = impersonate_funded(rpc, STRANGER).await?;

    let snapshot = rpc.snapshot().await?;

    let Some((vote_id, _)) = start_vote(rpc, config, &creator, script, true).await? else {
        bail!("Vote {} was not created", script.name());
    };
    let receipt = pass_and_exec_dao_vote(rpc, &contracts, &stranger, vote_id).await?;

    let proposal_ids = proposal_ids_from_receipt(&receipt);
    if !proposal_ids.is_empty() {
        info!("Vote #{vote_id} submitted proposals {proposal_ids:?}");
        DualGovernanceContracts::for_contracts(&contracts)?
            .process_proposals(rpc, &stranger, &proposal_ids)
            .await?;
    }

    if revert {
        ensure!(rpc.revert(snapshot).await?, "Unable to revert to snapshot {snapshot}");
        info!("Fork reverted to snapshot {snapshot}");
    }
    Ok(vote_id)
}
