//! Vote actions routed through the Agent, Dual Governance or Voting itself

use lido_bindings::{encoders::agent_forward, Contracts, ProposalCall};
use lido_core::{CallScriptItem, EvmScriptError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Who executes an action once the vote passes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteActionKind {
    /// Through `agent.forward` inside a Dual Governance proposal
    Agent,
    /// As a Dual Governance proposal call, the admin executor being the caller
    DualGovernanceAdmin,
    /// Directly from the Voting contract
    Voting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteAction {
    pub kind: VoteActionKind,
    pub call: CallScriptItem,
}

pub const fn forward_agent(call: CallScriptItem) -> VoteAction {
    VoteAction {
        kind: VoteActionKind::Agent,
        call,
    }
}

pub const fn forward_dg_admin(call: CallScriptItem) -> VoteAction {
    VoteAction {
        kind: VoteActionKind::DualGovernanceAdmin,
        call,
    }
}

pub const fn forward_voting(call: CallScriptItem) -> VoteAction {
    VoteAction {
        kind: VoteActionKind::Voting,
        call,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteItemsError {
    #[error("Direct voting actions can only appear before all other actions or after them, not interleaved")]
    InterleavedVotingActions,
    #[error("Dual Governance is not deployed on this network")]
    NoDualGovernance,
    #[error(transparent)]
    EvmScript(#[from] EvmScriptError),
}

/// Split items into descriptions and actions, rejecting direct voting
/// actions placed between proposal actions
pub fn validate_and_aggregate(
    items: Vec<(String, VoteAction)>,
) -> Result<(Vec<String>, Vec<VoteAction>), VoteItemsError> {
    let is_voting = |action: &VoteAction| action.kind == VoteActionKind::Voting;

    if let (Some(first), Some(last)) = (
        items.iter().position(|(_, a)| !is_voting(a)),
        items.iter().rposition(|(_, a)| !is_voting(a)),
    ) {
        if items[first..=last].iter().any(|(_, a)| is_voting(a)) {
            return Err(VoteItemsError::InterleavedVotingActions);
        }
    }

    Ok(items.into_iter().unzip())
}

/// One `submitProposal` call carrying all Agent and admin actions
fn encode_dual_governance_proposal(
    contracts: &Contracts,
    actions: &[VoteAction],
    description: &str,
) -> Result<CallScriptItem, VoteItemsError> {
    let dual_governance = contracts
        .dual_governance()
        .ok_or(VoteItemsError::NoDualGovernance)?;

    let mut calls: Vec<ProposalCall> = Vec::with_capacity(actions.len());
    for action in actions {
        match action.kind {
            VoteActionKind::Agent => {
                calls.push(agent_forward(&contracts.agent(), std::slice::from_ref(&action.call))?.into());
            }
            VoteActionKind::DualGovernanceAdmin => calls.push(action.call.clone().into()),
            VoteActionKind::Voting => {}
        }
    }

    debug!("Proposal with {} calls: {description}", calls.len());
    Ok(dual_governance.submit_proposal(&calls, description))
}

/// Vote items ready for the call script
///
/// Direct voting actions come first, in their original order. Agent and
/// admin actions follow as a single Dual Governance proposal whose
/// description joins theirs with newlines, so the proposal is always the
/// last item of the vote.
pub fn build_executable_vote_items(
    contracts: &Contracts,
    items: Vec<(String, VoteAction)>,
) -> Result<Vec<(String, CallScriptItem)>, VoteItemsError> {
    let (descriptions, actions) = validate_and_aggregate(items)?;

    let mut executable = Vec::new();
    let mut proposal = Vec::new();
    for (description, action) in descriptions.into_iter().zip(actions) {
        match action.kind {
            VoteActionKind::Voting => executable.push((description, action.call)),
            _ => proposal.push((description, action)),
        }
    }

    if !proposal.is_empty() {
        let description = proposal
            .iter()
            .map(|(d, _)| d.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let actions: Vec<VoteAction> = proposal.into_iter().map(|(_, a)| a).collect();
        let call = encode_dual_governance_proposal(contracts, &actions, &description)?;
        executable.push((description, call));
    }
    Ok(executable)
}
