//! Replaying votes on a forked chain

use alloy_primitives::{Address, U256};
use anyhow::{ensure, Result};
use lido_bindings::{dual_governance::PROPOSAL_SUBMITTED_TOPIC, Contracts};
use lido_core::pow10;
use tracing::info;

use crate::rpc::{transact, view_word, EthRpc, Receipt, TxParams};

/// Minimum ETH balance of an impersonated account, 0.1 ether
fn gas_topup() -> U256 {
    pow10(17)
}

/// Impersonate `account`, topping its balance up to pay for gas
pub async fn impersonate_funded(rpc: &dyn EthRpc, account: Address) -> Result<TxParams> {
    rpc.impersonate(account).await?;
    let balance = rpc.balance(account).await?;
    if balance < gas_topup() {
        rpc.set_balance(account, balance + gas_topup()).await?;
    }
    Ok(TxParams::from(account))
}

/// Vote `yes` from every LDO vote executor, wait for the vote to end and
/// execute it
pub async fn pass_and_exec_dao_vote(
    rpc: &dyn EthRpc,
    contracts: &Contracts,
    stranger: &TxParams,
    vote_id: U256,
) -> Result<Receipt> {
    let voting = contracts.voting();

    for &holder in contracts.ldo_vote_executors {
        let voter = impersonate_funded(rpc, holder).await?;
        transact(rpc, &voter, &voting.vote(vote_id, true, false)).await?;
        info!("Voted for #{vote_id} from {holder}");
    }

    let vote_time = u64::try_from(view_word(rpc, &voting.vote_time()).await?)?;
    rpc.sleep(vote_time).await?;
    rpc.mine().await?;

    ensure!(
        !view_word(rpc, &voting.can_execute(vote_id)).await?.is_zero(),
        "Vote #{vote_id} cannot be executed"
    );

    let receipt = transact(rpc, stranger, &voting.execute_vote(vote_id)).await?;
    info!("Vote #{vote_id} executed in block {}", receipt.block_number);
    Ok(receipt)
}

/// Ids of the Dual Governance proposals submitted within a transaction
pub fn proposal_ids_from_receipt(receipt: &Receipt) -> Vec<U256> {
    receipt
        .logs_with_topic(PROPOSAL_SUBMITTED_TOPIC)
        .filter_map(|log| log.topics.get(1))
        .map(|topic| U256::from_be_bytes(topic.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use lido_bindings::Network;
    use alloy_sol_types::SolValue;
    use lido_core::selector;

    use crate::mock::MockRpc;
    use crate::rpc::Log;

    fn bool_word(value: bool) -> Vec<u8> {
        value.abi_encode()
    }

    #[tokio::test]
    async fn test_pass_and_exec_dao_vote() {
        let contracts = Contracts::for_network(Network::Mainnet);
        let rpc = MockRpc::with_time(1_000);
        let rich = contracts.ldo_vote_executors[0];
        rpc.fund(rich, pow10(20));
        rpc.on_call(contracts.voting, "voteTime()", U256::from(259_200u64).abi_encode());
        rpc.on_call(contracts.voting, "canExecute(uint256)", bool_word(true));

        let stranger = TxParams::from(Address::repeat_byte(0x51));
        let receipt = pass_and_exec_dao_vote(&rpc, &contracts, &stranger, U256::from(190u64))
            .await
            .unwrap();
        assert!(receipt.status);

        assert_eq!(rpc.impersonated(), contracts.ldo_vote_executors);
        assert_eq!(rpc.balance(rich).await.unwrap(), pow10(20));
        assert_eq!(rpc.balance(contracts.ldo_vote_executors[1]).await.unwrap(), gas_topup());
        assert_eq!(rpc.time(), 1_000 + 259_200);

        let sent = rpc.sent();
        assert_eq!(sent.len(), 4);
        assert!(sent[..3]
            .iter()
            .zip(contracts.ldo_vote_executors)
            .all(|((from, item), holder)| from == holder && item.selector() == Some(selector("vote(uint256,bool,bool)"))));
        assert_eq!(sent[3].0, stranger.from);
        assert_eq!(sent[3].1.selector(), Some(selector("executeVote(uint256)")));
    }

    #[tokio::test]
    async fn test_vote_not_executable() {
        let contracts = Contracts::for_network(Network::Mainnet);
        let rpc = MockRpc::new();
        rpc.on_call(contracts.voting, "voteTime()", U256::from(10u64).abi_encode());
        rpc.on_call(contracts.voting, "canExecute(uint256)", bool_word(false));

        let err = pass_and_exec_dao_vote(&rpc, &contracts, &TxParams::from(Address::ZERO), U256::from(3u64))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Vote #3 cannot be executed");
    }

    #[test]
    fn test_proposal_ids_from_receipt() {
        let id_topic = |id: u64| B256::from(U256::from(id));
        let receipt = Receipt {
            tx_hash: B256::ZERO,
            status: true,
            block_number: 1,
            logs: vec![
                Log {
                    address: Address::repeat_byte(1),
                    topics: vec![PROPOSAL_SUBMITTED_TOPIC, id_topic(5)],
                    data: Default::default(),
                },
                Log {
                    address: Address::repeat_byte(1),
                    topics: vec![B256::repeat_byte(9), id_topic(6)],
                    data: Default::default(),
                },
                Log {
                    address: Address::repeat_byte(1),
                    topics: vec![PROPOSAL_SUBMITTED_TOPIC, id_topic(7)],
                    data: Default::default(),
                },
            ],
        };
        assert_eq!(proposal_ids_from_receipt(&receipt), vec![U256::from(5u64), U256::from(7u64)]);
    }
}
