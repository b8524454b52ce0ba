//! Configuration

use std::env;
use std::str::FromStr;

use alloy_primitives::Address;
use lido_bindings::{Contracts, Network};
use serde::{Deserialize, Serialize};

use crate::rpc::TxParams;

/// IPFS pinning service used for vote descriptions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpfsService {
    /// `api.web3.storage`, bearer token auth
    #[default]
    Web3Storage,
    /// `ipfs.infura.io`, project id and secret
    Infura,
}

impl From<&str> for IpfsService {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "infura" | "infura.io" => Self::Infura,
            _ => Self::Web3Storage,
        }
    }
}

/// IPFS credentials
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IpfsConfig {
    pub service: IpfsService,
    pub web3_storage_token: Option<String>,
    pub infura_project_id: Option<String>,
    pub infura_project_secret: Option<String>,
}

impl IpfsConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            service: env::var("IPFS_SERVICE")
                .map(|s| IpfsService::from(s.as_str()))
                .unwrap_or_default(),
            web3_storage_token: env::var("WEB3_STORAGE_TOKEN").ok(),
            infura_project_id: env::var("WEB3_INFURA_IPFS_PROJECT_ID").ok(),
            infura_project_secret: env::var("WEB3_INFURA_IPFS_PROJECT_SECRET").ok(),
        }
    }
}

/// Host configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint, a fork or a live node with unlocked accounts
    pub rpc_url: String,
    pub network: Network,
    /// Account opening votes
    pub deployer: Option<Address>,
    /// Live network: set fees and refuse fork-only helpers
    pub is_live: bool,
    pub priority_fee_gwei: u64,
    pub max_fee_gwei: u64,
    pub ipfs: IpfsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            network: Network::Mainnet,
            deployer: None,
            is_live: false,
            priority_fee_gwei: 2,
            max_fee_gwei: 300,
            ipfs: IpfsConfig::default(),
        }
    }
}

impl Config {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            network: env::var("NETWORK")
                .map(|s| Network::from(s.as_str()))
                .unwrap_or_default(),
            deployer: env::var("DEPLOYER")
                .ok()
                .and_then(|s| Address::from_str(&s).ok()),
            is_live: env::var("IS_LIVE")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            priority_fee_gwei: env::var("OMNIBUS_PRIORITY_FEE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_fee_gwei: env::var("OMNIBUS_MAX_FEE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            ipfs: IpfsConfig::from_env(),
        }
    }

    pub const fn contracts(&self) -> Contracts {
        Contracts::for_network(self.network)
    }

    /// Transaction parameters of the deployer; fees are only set on a live network
    pub fn tx_params(&self) -> anyhow::Result<TxParams> {
        let from = self
            .deployer
            .ok_or_else(|| anyhow::anyhow!("DEPLOYER is not set"))?;
        Ok(if self.is_live {
            TxParams {
                from,
                priority_fee_gwei: Some(self.priority_fee_gwei),
                max_fee_gwei: Some(self.max_fee_gwei),
            }
        } else {
            TxParams::from(from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.priority_fee_gwei, 2);
        assert_eq!(config.max_fee_gwei, 300);
        assert_eq!(config.ipfs.service, IpfsService::Web3Storage);
        assert!(config.tx_params().is_err());
    }

    #[test]
    fn test_tx_params_fees_only_when_live() {
        let deployer = Address::repeat_byte(0xde);
        let mut config = Config {
            deployer: Some(deployer),
            ..Default::default()
        };
        let params = config.tx_params().unwrap();
        assert_eq!(params.from, deployer);
        assert_eq!(params.priority_fee_gwei, None);

        config.is_live = true;
        let params = config.tx_params().unwrap();
        assert_eq!(params.priority_fee_gwei, Some(2));
        assert_eq!(params.max_fee_gwei, Some(300));
    }

    #[test]
    fn test_ipfs_service_from_str() {
        assert_eq!(IpfsService::from("infura"), IpfsService::Infura);
        assert_eq!(IpfsService::from("web3.storage"), IpfsService::Web3Storage);
        assert_eq!(IpfsService::from(""), IpfsService::Web3Storage);
    }
}
