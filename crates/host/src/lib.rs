//! Host-side logic for Lido DAO votes

pub mod config;
pub mod dual_governance;
pub mod fork;
pub mod ipfs;
pub mod oracle;
pub mod rpc;
pub mod script;
pub mod vote_items;
pub mod voting;

#[cfg(test)]
mod mock;

pub use config::{Config, IpfsConfig, IpfsService};
pub use dual_governance::DualGovernanceContracts;
pub use ipfs::IpfsDescription;
pub use oracle::{AccountingContracts, ExitBusOracleContracts, OracleContracts};
pub use rpc::{EthRpc, HttpRpc, Receipt, TxParams};
pub use script::{run_on_fork, start_vote, VoteScript};
pub use vote_items::{forward_agent, forward_dg_admin, forward_voting, VoteAction};
pub use voting::VoteItems;
