//! Oracle reports pushed on a fork
//!
//! Every fast-lane member of the HashConsensus votes for the report hash,
//! then the first member submits the report data to the oracle.
//!
//! [`AccountingContracts::oracle_report`] builds a report the protocol will
//! accept: the rebase is simulated with `handleOracleReport` called from the
//! oracle, and the withdrawal queue is asked for finalization batches at the
//! simulated share rate.

use alloy_primitives::{Address, B256, I256, U256};
use alloy_sol_types::SolValue;
use anyhow::{anyhow, ensure, Context, Result};
use lido_bindings::{
    AccountingOracle, BatchesCalculationState, Burner, Contracts, HashConsensus, Lido, OracleReportInputs,
    OracleReportSanityChecker, ValidatorsExitBusOracle, WithdrawalQueue,
};
use lido_core::{
    extra_data::ExtraData,
    oracle_report::{share_rate_precision, AccountingReport, ExitBusReport},
    CallScriptItem,
};
use tracing::{debug, info};

use crate::fork::impersonate_funded;
use crate::rpc::{transact, view, view_words, EthRpc, Receipt, TxParams};

/// Seconds since the previous report assumed by the rebase simulation
pub const SIMULATED_TIME_ELAPSED: u64 = 24 * 60 * 60;

/// Requests the withdrawal queue walks per `calculateFinalizationBatches` call
pub const MAX_REQUESTS_PER_CALL: u64 = 10_000;

/// Index of `requestTimestampMargin` in the sanity checker limits
const REQUEST_TIMESTAMP_MARGIN_INDEX: usize = 7;

#[derive(Clone, Copy, Debug)]
struct ChainConfig {
    slots_per_epoch: u64,
    seconds_per_slot: u64,
    genesis_time: u64,
}

/// Transactions of a pushed report
#[derive(Clone, Debug)]
pub struct OracleReportReceipts {
    pub main_data: Receipt,
    pub extra_data: Vec<Receipt>,
}

fn small(words: &[U256], index: usize, name: &str) -> Result<u64> {
    let word = words
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("Missing {name} in return data"))?;
    u64::try_from(word).map_err(|_| anyhow!("{name} does not fit into u64: {word}"))
}

async fn resolve_consensus(
    rpc: &dyn EthRpc,
    known: Option<HashConsensus>,
    get_consensus_contract: &CallScriptItem,
) -> Result<HashConsensus> {
    if let Some(hash_consensus) = known {
        return Ok(hash_consensus);
    }
    let consensus = view(rpc, get_consensus_contract, &["address"]).await?;
    consensus
        .first()
        .and_then(|token| token.as_address())
        .map(HashConsensus::new)
        .context("Invalid consensus contract")
}

async fn first_word(rpc: &dyn EthRpc, call: &CallScriptItem, name: &str) -> Result<U256> {
    let words = view_words(rpc, call).await?;
    words.first().copied().with_context(|| format!("Empty {name}"))
}

/// Submit `report_hash` from every fast-lane member of `hash_consensus`,
/// returning the first member as the report submitter
pub async fn reach_consensus(
    rpc: &dyn EthRpc,
    hash_consensus: &HashConsensus,
    ref_slot: U256,
    report_hash: B256,
    consensus_version: U256,
) -> Result<Address> {
    let members = view(rpc, &hash_consensus.get_fast_lane_members(), &["address[]", "uint256[]"]).await?;
    let members: Vec<Address> = members
        .first()
        .and_then(|token| token.as_array())
        .map(|tokens| tokens.iter().filter_map(|t| t.as_address()).collect())
        .unwrap_or_default();
    let submitter = *members.first().context("HashConsensus has no fast lane members")?;

    let submit = hash_consensus.submit_report(ref_slot, report_hash, consensus_version);
    for &member in &members {
        debug!("Member {member} submitting report to HashConsensus");
        let member = impersonate_funded(rpc, member).await?;
        transact(rpc, &member, &submit).await?;
    }

    let state = view_words(rpc, &hash_consensus.get_consensus_state()).await?;
    let consensus_report = state.get(1).copied().map(B256::from);
    ensure!(
        consensus_report == Some(report_hash),
        "HashConsensus points to unexpected report"
    );
    Ok(submitter)
}

/// AccountingOracle with its HashConsensus
#[derive(Clone, Copy, Debug)]
pub struct OracleContracts {
    pub accounting_oracle: AccountingOracle,
    pub hash_consensus: HashConsensus,
}

impl OracleContracts {
    /// Use the HashConsensus from the address book or ask the oracle for it
    pub async fn resolve(rpc: &dyn EthRpc, contracts: &Contracts) -> Result<Self> {
        let accounting_oracle = contracts.accounting_oracle();
        let hash_consensus = resolve_consensus(
            rpc,
            contracts.hash_consensus_for_accounting_oracle(),
            &accounting_oracle.get_consensus_contract(),
        )
        .await?;
        Ok(Self {
            accounting_oracle,
            hash_consensus,
        })
    }

    /// Reference slot of the current frame
    async fn current_frame(&self, rpc: &dyn EthRpc) -> Result<u64> {
        let frame = view_words(rpc, &self.hash_consensus.get_current_frame()).await?;
        small(&frame, 0, "refSlot")
    }

    pub async fn reach_consensus(
        &self,
        rpc: &dyn EthRpc,
        ref_slot: U256,
        report_hash: B256,
        consensus_version: U256,
    ) -> Result<Address> {
        reach_consensus(rpc, &self.hash_consensus, ref_slot, report_hash, consensus_version).await
    }

    /// Push `report` with `extra_data` through consensus and the oracle
    ///
    /// Consensus version and extra data fields of `report` are overwritten
    /// with the on-chain version and `extra_data`.
    pub async fn push_oracle_report(
        &self,
        rpc: &dyn EthRpc,
        mut report: AccountingReport,
        extra_data: &ExtraData,
    ) -> Result<OracleReportReceipts> {
        info!("Preparing oracle report for refSlot: {}", report.refSlot);
        let consensus_version =
            first_word(rpc, &self.accounting_oracle.get_consensus_version(), "consensus version").await?;
        let contract_version =
            first_word(rpc, &self.accounting_oracle.get_contract_version(), "contract version").await?;

        report.consensusVersion = consensus_version;
        report.extraDataFormat = U256::from(extra_data.format as u8);
        report.extraDataHash = extra_data.report_hash();
        report.extraDataItemsCount = U256::from(extra_data.items_count);
        let report_hash = report.hash();

        let submitter = self
            .reach_consensus(rpc, report.refSlot, report_hash, consensus_version)
            .await?;
        let submitter = TxParams::from(submitter);

        let main_data = transact(
            rpc,
            &submitter,
            &self.accounting_oracle.submit_report_data(&report, contract_version),
        )
        .await?;
        info!("Submitted report data");

        let extra_data_receipts = if extra_data.transactions.is_empty() {
            let receipt = transact(rpc, &submitter, &self.accounting_oracle.submit_report_extra_data_empty()).await?;
            info!("Submitted empty extra data report");
            vec![receipt]
        } else {
            let mut receipts = Vec::with_capacity(extra_data.transactions.len());
            for transaction in &extra_data.transactions {
                let item = self.accounting_oracle.submit_report_extra_data_list(transaction);
                receipts.push(transact(rpc, &submitter, &item).await?);
            }
            info!("Submitted {} extra data transactions", receipts.len());
            receipts
        };

        let state = view_words(rpc, &self.accounting_oracle.get_processing_state()).await?;
        ensure!(state.len() >= 9, "Unexpected processing state length {}", state.len());
        ensure!(state[0] == report.refSlot, "Processing state refers to another frame");
        ensure!(B256::from(state[2]) == report_hash, "Unexpected main data hash");
        ensure!(!state[3].is_zero(), "Main data is not submitted");
        ensure!(B256::from(state[4]) == report.extraDataHash, "Unexpected extra data hash");
        ensure!(state[5] == report.extraDataFormat, "Unexpected extra data format");
        ensure!(!state[6].is_zero(), "Extra data is not submitted");
        ensure!(state[7] == report.extraDataItemsCount, "Unexpected extra data items count");
        ensure!(state[8] == state[7], "Not all extra data items are submitted");

        Ok(OracleReportReceipts {
            main_data,
            extra_data: extra_data_receipts,
        })
    }

    async fn chain_config(&self, rpc: &dyn EthRpc) -> Result<ChainConfig> {
        let words = view_words(rpc, &self.hash_consensus.get_chain_config()).await?;
        Ok(ChainConfig {
            slots_per_epoch: small(&words, 0, "slotsPerEpoch")?,
            seconds_per_slot: small(&words, 1, "secondsPerSlot")?,
            genesis_time: small(&words, 2, "genesisTime")?,
        })
    }

    /// Move the chain to the start of the next reporting frame
    pub async fn wait_to_next_available_report_time(&self, rpc: &dyn EthRpc) -> Result<()> {
        let ChainConfig {
            slots_per_epoch,
            seconds_per_slot,
            genesis_time,
        } = self.chain_config(rpc).await?;

        let ref_slot = self.current_frame(rpc).await?;
        let now = rpc.chain_time().await?;
        let frame_config = view_words(rpc, &self.hash_consensus.get_frame_config()).await?;
        let epochs_per_frame = small(&frame_config, 1, "epochsPerFrame")?;

        let frame_slots = slots_per_epoch * epochs_per_frame;
        let frame_start = genesis_time + (ref_slot + frame_slots + 1) * seconds_per_slot;
        rpc.sleep(frame_start.saturating_sub(now)).await?;
        rpc.mine().await?;

        let next_ref_slot = self.current_frame(rpc).await?;
        ensure!(next_ref_slot == ref_slot + frame_slots, "should be next frame");
        Ok(())
    }
}

/// ValidatorsExitBusOracle with its HashConsensus
#[derive(Clone, Copy, Debug)]
pub struct ExitBusOracleContracts {
    pub validators_exit_bus_oracle: ValidatorsExitBusOracle,
    pub hash_consensus: HashConsensus,
}

impl ExitBusOracleContracts {
    pub async fn resolve(rpc: &dyn EthRpc, contracts: &Contracts) -> Result<Self> {
        let validators_exit_bus_oracle = contracts.validators_exit_bus_oracle();
        let hash_consensus = resolve_consensus(
            rpc,
            contracts.hash_consensus_for_validators_exit_bus_oracle(),
            &validators_exit_bus_oracle.get_consensus_contract(),
        )
        .await?;
        Ok(Self {
            validators_exit_bus_oracle,
            hash_consensus,
        })
    }

    /// Push `report` through consensus and the exit bus oracle
    ///
    /// The consensus version of `report` is overwritten with the on-chain one.
    pub async fn push_exit_bus_report(&self, rpc: &dyn EthRpc, mut report: ExitBusReport) -> Result<Receipt> {
        info!(
            "Preparing exit bus report for refSlot: {} with {} requests",
            report.refSlot, report.requestsCount
        );
        let oracle = &self.validators_exit_bus_oracle;
        report.consensusVersion = first_word(rpc, &oracle.get_consensus_version(), "consensus version").await?;
        let contract_version = first_word(rpc, &oracle.get_contract_version(), "contract version").await?;
        let report_hash = report.hash();

        let submitter = reach_consensus(
            rpc,
            &self.hash_consensus,
            report.refSlot,
            report_hash,
            report.consensusVersion,
        )
        .await?;
        let receipt = transact(
            rpc,
            &TxParams::from(submitter),
            &oracle.submit_report_data(&report, contract_version),
        )
        .await?;
        info!("Submitted exit bus report data");

        let state = view_words(rpc, &oracle.get_processing_state()).await?;
        ensure!(state.len() >= 7, "Unexpected processing state length {}", state.len());
        ensure!(state[0] == report.refSlot, "Processing state refers to another frame");
        ensure!(B256::from(state[2]) == report_hash, "Unexpected report data hash");
        ensure!(!state[3].is_zero(), "Report data is not submitted");
        ensure!(state[4] == report.dataFormat, "Unexpected data format");
        ensure!(state[5] == report.requestsCount, "Unexpected requests count");
        ensure!(state[6] == state[5], "Not all exit requests are processed");
        Ok(receipt)
    }
}

/// Outcome of a simulated `handleOracleReport`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulatedReport {
    pub post_total_pooled_ether: U256,
    pub post_total_shares: U256,
    pub withdrawals: U256,
    pub el_rewards: U256,
}

impl SimulatedReport {
    /// `postTotalPooledEther * 1e27 / postTotalShares`
    pub fn share_rate(&self) -> Result<U256> {
        ensure!(!self.post_total_shares.is_zero(), "Simulated report has no shares");
        self.post_total_pooled_ether
            .checked_mul(share_rate_precision())
            .map(|scaled| scaled / self.post_total_shares)
            .ok_or_else(|| anyhow!("Share rate overflow for {} pooled ether", self.post_total_pooled_ether))
    }
}

/// Consensus layer balance after applying a signed difference
pub fn apply_cl_diff(balance: U256, cl_diff: I256) -> Result<U256> {
    let (sign, abs) = cl_diff.into_sign_and_abs();
    let post = if sign.is_negative() {
        balance.checked_sub(abs)
    } else {
        balance.checked_add(abs)
    };
    post.ok_or_else(|| anyhow!("Consensus layer balance {balance} cannot change by {cl_diff}"))
}

/// Everything read while preparing an accounting report
#[derive(Clone, Copy, Debug)]
pub struct AccountingContracts {
    pub oracle: OracleContracts,
    pub lido: Lido,
    pub withdrawal_queue: WithdrawalQueue,
    pub burner: Burner,
    pub sanity_checker: OracleReportSanityChecker,
    pub withdrawal_vault: Address,
    pub el_rewards_vault: Address,
}

impl AccountingContracts {
    pub async fn resolve(rpc: &dyn EthRpc, contracts: &Contracts) -> Result<Self> {
        Ok(Self {
            oracle: OracleContracts::resolve(rpc, contracts).await?,
            lido: contracts.lido(),
            withdrawal_queue: contracts.withdrawal_queue(),
            burner: contracts.burner(),
            sanity_checker: contracts.oracle_report_sanity_checker(),
            withdrawal_vault: contracts.withdrawal_vault,
            el_rewards_vault: contracts.el_rewards_vault,
        })
    }

    /// Dry-run `handleOracleReport` from the accounting oracle
    ///
    /// The report is timed at `ref_slot` and assumes a day since the
    /// previous one; nothing is burnt or finalized.
    pub async fn simulate_report(
        &self,
        rpc: &dyn EthRpc,
        ref_slot: U256,
        beacon_validators: U256,
        post_cl_balance: U256,
        withdrawal_vault_balance: U256,
        el_rewards_vault_balance: U256,
    ) -> Result<SimulatedReport> {
        let chain = self.oracle.chain_config(rpc).await?;
        let report_timestamp =
            U256::from(chain.genesis_time) + ref_slot * U256::from(chain.seconds_per_slot);

        let inputs = OracleReportInputs {
            report_timestamp,
            time_elapsed: U256::from(SIMULATED_TIME_ELAPSED),
            cl_validators: beacon_validators,
            cl_balance: post_cl_balance,
            withdrawal_vault_balance,
            el_rewards_vault_balance,
            ..Default::default()
        };
        let data = rpc
            .call_from(self.oracle.accounting_oracle.address, &self.lido.handle_oracle_report(&inputs))
            .await
            .context("Simulating handleOracleReport")?;
        let [post_total_pooled_ether, post_total_shares, withdrawals, el_rewards] = <[U256; 4]>::abi_decode(&data)?;

        let simulated = SimulatedReport {
            post_total_pooled_ether,
            post_total_shares,
            withdrawals,
            el_rewards,
        };
        debug!("Simulated report: {simulated:?}");
        Ok(simulated)
    }

    /// Withdrawal request batches finalizable at `share_rate`
    ///
    /// The ETH budget is both vaults plus the part of the buffer reserved for
    /// unfinalized requests; requests younger than the sanity checker's
    /// timestamp margin are left out.
    pub async fn get_finalization_batches(
        &self,
        rpc: &dyn EthRpc,
        share_rate: U256,
        withdrawal_vault_balance: U256,
        el_rewards_vault_balance: U256,
    ) -> Result<Vec<U256>> {
        let limits = view_words(rpc, &self.sanity_checker.get_oracle_report_limits()).await?;
        let margin = small(&limits, REQUEST_TIMESTAMP_MARGIN_INDEX, "requestTimestampMargin")?;
        let buffered_ether = first_word(rpc, &self.lido.get_buffered_ether(), "buffered ether").await?;
        let unfinalized_steth =
            first_word(rpc, &self.withdrawal_queue.unfinalized_steth(), "unfinalized stETH").await?;

        let reserved_buffer = buffered_ether.min(unfinalized_steth);
        let available_eth = withdrawal_vault_balance + el_rewards_vault_balance + reserved_buffer;
        let max_timestamp = U256::from(rpc.chain_time().await?.saturating_sub(margin));

        let mut state = BatchesCalculationState::new(available_eth);
        loop {
            let item = self.withdrawal_queue.calculate_finalization_batches(
                share_rate,
                max_timestamp,
                U256::from(MAX_REQUESTS_PER_CALL),
                state,
            );
            state = BatchesCalculationState::abi_decode(&rpc.call(&item).await?)?;
            if state.finished {
                break;
            }
        }

        let batches: Vec<U256> = state.filled().collect();
        debug!("Finalization batches: {batches:?}");
        Ok(batches)
    }

    /// Wait for the next frame and push a report changing the consensus layer
    /// balance by `cl_diff`
    ///
    /// With `exclude_vaults_balances` the report claims both vaults are
    /// empty, which allows a zero or negative rebase. The withdrawal vault
    /// balance still funds the simulation and the finalization budget.
    pub async fn oracle_report(
        &self,
        rpc: &dyn EthRpc,
        cl_diff: I256,
        exclude_vaults_balances: bool,
    ) -> Result<OracleReportReceipts> {
        self.oracle.wait_to_next_available_report_time(rpc).await?;
        let ref_slot = U256::from(self.oracle.current_frame(rpc).await?);

        let mut withdrawal_vault_balance = rpc.balance(self.withdrawal_vault).await?;
        let mut el_rewards_vault_balance = rpc.balance(self.el_rewards_vault).await?;
        if exclude_vaults_balances {
            el_rewards_vault_balance = U256::ZERO;
        }

        let burn = view_words(rpc, &self.burner.get_shares_requested_to_burn()).await?;
        ensure!(burn.len() >= 2, "Unexpected getSharesRequestedToBurn length {}", burn.len());
        let beacon = view_words(rpc, &self.lido.get_beacon_stat()).await?;
        ensure!(beacon.len() >= 3, "Unexpected getBeaconStat length {}", beacon.len());
        let (beacon_validators, beacon_balance) = (beacon[1], beacon[2]);

        let post_cl_balance = apply_cl_diff(beacon_balance, cl_diff)?;
        let simulated = self
            .simulate_report(
                rpc,
                ref_slot,
                beacon_validators,
                post_cl_balance,
                withdrawal_vault_balance,
                el_rewards_vault_balance,
            )
            .await?;
        let share_rate = simulated.share_rate()?;
        let batches = self
            .get_finalization_batches(rpc, share_rate, simulated.withdrawals, simulated.el_rewards)
            .await?;

        if exclude_vaults_balances {
            withdrawal_vault_balance = U256::ZERO;
        }

        let mut report = AccountingReport::new(U256::ZERO, ref_slot, beacon_validators, post_cl_balance);
        report.withdrawalVaultBalance = withdrawal_vault_balance;
        report.elRewardsVaultBalance = el_rewards_vault_balance;
        report.sharesRequestedToBurn = burn[0] + burn[1];
        report.withdrawalFinalizationBatches = batches;
        report.simulatedShareRate = share_rate;

        self.oracle.push_oracle_report(rpc, report, &ExtraData::empty()).await
    }
}
