//! Dual Governance proposals on a fork
//!
//! Proposals submitted by a passed vote are driven through the timelock:
//! wait the after-submit delay, bring the state machine back to a state that
//! allows scheduling, schedule, wait the after-schedule delay and execute at
//! the next noon UTC.

use alloy_primitives::U256;
use anyhow::{anyhow, bail, ensure, Context, Result};
use lido_bindings::{
    Contracts, DualGovernance, DualGovernanceConfigProvider, DualGovernanceState, EmergencyProtectedTimelock,
    ProposalCall, ProposalStatus,
};
use lido_core::CallScriptItem;
use tracing::{info, warn};

use crate::rpc::{transact, view, view_word, view_words, EthRpc, TxParams};

/// Attempts to leave a state that blocks scheduling
pub const MAX_ITERATIONS: u32 = 1000;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const NOON_OFFSET: u64 = 12 * 60 * 60;

/// One `submitProposal` call per `(calls, description)` pair
pub fn submit_proposals(
    dual_governance: &DualGovernance,
    items: &[(Vec<CallScriptItem>, &str)],
) -> Vec<CallScriptItem> {
    items
        .iter()
        .map(|(calls, description)| {
            let calls: Vec<ProposalCall> = calls.iter().cloned().map(ProposalCall::from).collect();
            dual_governance.submit_proposal(&calls, description)
        })
        .collect()
}

/// Seconds from `now` to the next 12:00 UTC; a time at or past today's noon
/// waits for tomorrow's
pub const fn seconds_until_noon_utc(now: u64) -> u64 {
    let today_noon = now - now % SECONDS_PER_DAY + NOON_OFFSET;
    let target = if now >= today_noon {
        today_noon + SECONDS_PER_DAY
    } else {
        today_noon
    };
    target - now
}

fn word_to_u64(word: U256, name: &str) -> Result<u64> {
    u64::try_from(word).map_err(|_| anyhow!("{name} does not fit into u64: {word}"))
}

fn word(words: &[U256], index: usize, name: &str) -> Result<u64> {
    let value = words
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("Missing {name} in return data"))?;
    word_to_u64(value, name)
}

/// Dual Governance contracts of a network
#[derive(Clone, Copy, Debug)]
pub struct DualGovernanceContracts {
    pub dual_governance: DualGovernance,
    pub timelock: EmergencyProtectedTimelock,
}

impl DualGovernanceContracts {
    pub fn for_contracts(contracts: &Contracts) -> Result<Self> {
        Ok(Self {
            dual_governance: contracts
                .dual_governance()
                .context("Dual Governance is not deployed on this network")?,
            timelock: contracts
                .emergency_protected_timelock()
                .context("Emergency Protected Timelock is not deployed on this network")?,
        })
    }

    pub async fn proposal_status(&self, rpc: &dyn EthRpc, proposal_id: U256) -> Result<ProposalStatus> {
        let details = view_words(rpc, &self.timelock.get_proposal_details(proposal_id)).await?;
        let status = word(&details, 4, "proposal status")?;
        u8::try_from(status)
            .ok()
            .and_then(ProposalStatus::from_u8)
            .ok_or_else(|| anyhow!("Unknown proposal status {status}"))
    }

    async fn config_provider(&self, rpc: &dyn EthRpc) -> Result<DualGovernanceConfigProvider> {
        let provider = view(rpc, &self.dual_governance.get_config_provider(), &["address"]).await?;
        provider
            .first()
            .and_then(|token| token.as_address())
            .map(DualGovernanceConfigProvider::new)
            .ok_or_else(|| anyhow!("Invalid config provider"))
    }

    /// Wait out veto signalling and its deactivation, then activate the next state
    pub async fn wait_for_normal_state(&self, rpc: &dyn EthRpc, stranger: &TxParams) -> Result<()> {
        let details = view_words(rpc, &self.dual_governance.get_state_details()).await?;
        let effective_state = word(&details, 0, "effective state")?;
        let persisted_state_entered_at = word(&details, 2, "persistedStateEnteredAt")?;
        let veto_signalling_activated_at = word(&details, 3, "vetoSignallingActivatedAt")?;
        let veto_signalling_duration = word(&details, 7, "vetoSignallingDuration")?;

        let state = u8::try_from(effective_state)
            .ok()
            .and_then(DualGovernanceState::from_u8)
            .ok_or_else(|| anyhow!("Unknown Dual Governance state {effective_state}"))?;

        match state {
            DualGovernanceState::RageQuit => {
                bail!("Dual Governance is in Rage Quit state. Unable to process proposals.")
            }
            DualGovernanceState::VetoSignalling => {
                let now = rpc.chain_time().await?;
                let ends_at = veto_signalling_activated_at + veto_signalling_duration;
                if ends_at > now {
                    info!("Waiting {}s for veto signalling to end", ends_at - now);
                    rpc.sleep(ends_at - now + 1).await?;
                }
            }
            DualGovernanceState::VetoSignallingDeactivation => {
                let provider = self.config_provider(rpc).await?;
                let config = view_words(rpc, &provider.get_dual_governance_config()).await?;
                let max_duration = word(&config, 4, "vetoSignallingDeactivationMaxDuration")?;

                let now = rpc.chain_time().await?;
                let ends_at = persisted_state_entered_at + max_duration;
                if ends_at > now {
                    info!("Waiting {}s for veto signalling deactivation to end", ends_at - now);
                    rpc.sleep(ends_at - now + 1).await?;
                }
            }
            DualGovernanceState::Normal | DualGovernanceState::VetoCooldown => {}
        }

        transact(rpc, stranger, &self.dual_governance.activate_next_state()).await?;
        Ok(())
    }

    async fn can_schedule(&self, rpc: &dyn EthRpc, proposal_id: U256) -> Result<bool> {
        Ok(!view_word(rpc, &self.dual_governance.can_schedule_proposal(proposal_id))
            .await?
            .is_zero())
    }

    /// Schedule and execute every submitted or scheduled proposal in `proposal_ids`
    pub async fn process_proposals(&self, rpc: &dyn EthRpc, stranger: &TxParams, proposal_ids: &[U256]) -> Result<()> {
        let after_submit_delay = word_to_u64(
            view_word(rpc, &self.timelock.get_after_submit_delay()).await?,
            "afterSubmitDelay",
        )?;
        let after_schedule_delay = word_to_u64(
            view_word(rpc, &self.timelock.get_after_schedule_delay()).await?,
            "afterScheduleDelay",
        )?;

        let mut submitted = Vec::new();
        let mut scheduled = Vec::new();
        for &proposal_id in proposal_ids {
            match self.proposal_status(rpc, proposal_id).await? {
                ProposalStatus::Submitted => submitted.push(proposal_id),
                ProposalStatus::Scheduled => scheduled.push(proposal_id),
                status => warn!("Skipping proposal {proposal_id} with status {status:?}"),
            }
        }

        if let Some(&first) = submitted.first() {
            rpc.sleep(after_submit_delay + 1).await?;

            let mut iterations = 0;
            while !self.can_schedule(rpc, first).await? {
                self.wait_for_normal_state(rpc, stranger).await?;
                iterations += 1;
                if iterations > MAX_ITERATIONS {
                    bail!("Unable to schedule the proposal. ({first})");
                }
            }

            for proposal_id in submitted {
                transact(rpc, stranger, &self.dual_governance.schedule_proposal(proposal_id)).await?;
                info!("Scheduled proposal {proposal_id}");
                scheduled.push(proposal_id);
            }
        }

        if !scheduled.is_empty() {
            rpc.sleep(after_schedule_delay + 1).await?;
            let now = rpc.chain_time().await?;
            rpc.sleep(seconds_until_noon_utc(now)).await?;

            for proposal_id in scheduled {
                transact(rpc, stranger, &self.timelock.execute(proposal_id)).await?;
                ensure!(
                    self.proposal_status(rpc, proposal_id).await? == ProposalStatus::Executed,
                    "Proposal {proposal_id} execution failed"
                );
                info!("Executed proposal {proposal_id}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_sol_types::SolCall;
    use lido_bindings::{dual_governance::IDualGovernance, Network};
    use lido_core::{abi, selector, DynSolValue};

    use crate::mock::MockRpc;

    const DAY: u64 = 86_400;

    fn words(values: &[u64]) -> Vec<u8> {
        abi::encode(
            &values
                .iter()
                .map(|v| DynSolValue::Uint(U256::from(*v), 256))
                .collect::<Vec<_>>(),
        )
    }

    fn proposal_details(id: u64, status: ProposalStatus) -> Vec<u8> {
        words(&[id, 0, 1, 2, status as u64])
    }

    fn setup(rpc: &MockRpc) -> DualGovernanceContracts {
        let dg = DualGovernanceContracts::for_contracts(&Contracts::for_network(Network::Mainnet)).unwrap();
        rpc.on_call(dg.timelock.address, "getAfterSubmitDelay()", words(&[3 * DAY]));
        rpc.on_call(dg.timelock.address, "getAfterScheduleDelay()", words(&[DAY]));
        dg
    }

    #[test]
    fn test_seconds_until_noon_utc() {
        let midnight = 1_700_006_400; // 2023-11-15 00:00:00 UTC
        assert_eq!(seconds_until_noon_utc(midnight), 12 * 3600);
        assert_eq!(seconds_until_noon_utc(midnight + 11 * 3600), 3600);
        assert_eq!(seconds_until_noon_utc(midnight + 12 * 3600), DAY);
        assert_eq!(seconds_until_noon_utc(midnight + 13 * 3600), 23 * 3600);
    }

    #[test]
    fn test_submit_proposals() {
        let dg = DualGovernance::new(Address::repeat_byte(0xd9));
        let calls = vec![CallScriptItem::new(Address::repeat_byte(1), vec![1, 2, 3, 4])];
        let items = submit_proposals(&dg, &[(calls, "first"), (Vec::new(), "second")]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].target, dg.address);
        assert_eq!(hex::encode(items[0].selector().unwrap()), "53e51f8b");

        let args = IDualGovernance::submitProposalCall::abi_decode(&items[1].calldata).unwrap();
        assert!(args.calls.is_empty());
        assert_eq!(args.metadata, "second");
    }

    #[tokio::test]
    async fn test_process_submitted_proposal() {
        let rpc = MockRpc::with_time(1_700_006_400);
        let dg = setup(&rpc);
        let id = U256::from(7u64);
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(7, ProposalStatus::Submitted));
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(7, ProposalStatus::Executed));
        rpc.on_call(dg.dual_governance.address, "canScheduleProposal(uint256)", words(&[1]));

        let stranger = TxParams::from(Address::repeat_byte(0x55));
        dg.process_proposals(&rpc, &stranger, &[id]).await.unwrap();

        assert_eq!(
            rpc.sent_selectors(),
            vec![selector("scheduleProposal(uint256)"), selector("execute(uint256)")]
        );
        // delays plus alignment to noon
        assert_eq!(rpc.time() % DAY, 12 * 3600);
        assert!(rpc.time() >= 1_700_006_400 + 4 * DAY + 2);
    }

    #[tokio::test]
    async fn test_veto_signalling_is_waited_out() {
        let start = 1_700_006_400;
        let rpc = MockRpc::with_time(start);
        let dg = setup(&rpc);
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(1, ProposalStatus::Submitted));
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(1, ProposalStatus::Executed));
        rpc.on_call(dg.dual_governance.address, "canScheduleProposal(uint256)", words(&[0]));
        rpc.on_call(dg.dual_governance.address, "canScheduleProposal(uint256)", words(&[1]));
        // veto signalling activated at start, lasting ten days
        rpc.on_call(
            dg.dual_governance.address,
            "getStateDetails()",
            words(&[2, 2, start, start, 0, 0, 0, 10 * DAY]),
        );

        let stranger = TxParams::from(Address::repeat_byte(0x55));
        dg.process_proposals(&rpc, &stranger, &[U256::from(1u64)]).await.unwrap();
        assert_eq!(
            rpc.sent_selectors(),
            vec![
                selector("activateNextState()"),
                selector("scheduleProposal(uint256)"),
                selector("execute(uint256)"),
            ]
        );
        assert!(rpc.time() > start + 10 * DAY);
    }

    #[tokio::test]
    async fn test_deactivation_reads_config_provider() {
        let start = 1_700_006_400;
        let rpc = MockRpc::with_time(start);
        let dg = setup(&rpc);
        let provider = Address::repeat_byte(0xcf);
        rpc.on_call(dg.dual_governance.address, "getStateDetails()", words(&[3, 3, start, 0, 0, 0, 0, 0]));
        rpc.on_call(dg.dual_governance.address, "getConfigProvider()", abi::encode(&[DynSolValue::Address(provider)]));
        rpc.on_call(provider, "getDualGovernanceConfig()", words(&[0, 0, 0, 0, 5 * DAY, 0]));

        dg.wait_for_normal_state(&rpc, &TxParams::from(Address::ZERO)).await.unwrap();
        assert_eq!(rpc.time(), start + 5 * DAY + 1);
        assert_eq!(rpc.sent_selectors(), vec![selector("activateNextState()")]);
    }

    #[tokio::test]
    async fn test_rage_quit_aborts() {
        let rpc = MockRpc::new();
        let dg = setup(&rpc);
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(1, ProposalStatus::Submitted));
        rpc.on_call(dg.dual_governance.address, "canScheduleProposal(uint256)", words(&[0]));
        rpc.on_call(dg.dual_governance.address, "getStateDetails()", words(&[5, 5, 0, 0, 0, 0, 0, 0]));

        let err = dg
            .process_proposals(&rpc, &TxParams::from(Address::ZERO), &[U256::from(1u64)])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Dual Governance is in Rage Quit state. Unable to process proposals.");
    }

    #[tokio::test]
    async fn test_unschedulable_proposal_gives_up() {
        let rpc = MockRpc::new();
        let dg = setup(&rpc);
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(4, ProposalStatus::Submitted));
        rpc.on_call(dg.dual_governance.address, "canScheduleProposal(uint256)", words(&[0]));
        rpc.on_call(dg.dual_governance.address, "getStateDetails()", words(&[1, 1, 0, 0, 0, 0, 0, 0]));

        let err = dg
            .process_proposals(&rpc, &TxParams::from(Address::ZERO), &[U256::from(4u64)])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to schedule the proposal. (4)");
        assert_eq!(rpc.sent().len(), MAX_ITERATIONS as usize + 1);
    }

    #[tokio::test]
    async fn test_failed_execution() {
        let rpc = MockRpc::new();
        let dg = setup(&rpc);
        rpc.on_call(dg.timelock.address, "getProposalDetails(uint256)", proposal_details(9, ProposalStatus::Scheduled));

        let err = dg
            .process_proposals(&rpc, &TxParams::from(Address::ZERO), &[U256::from(9u64)])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Proposal 9 execution failed");
    }
}
