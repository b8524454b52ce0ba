//! Omnibus binary

mod votes;

use std::{collections::BTreeMap, path::PathBuf};

use alloy_primitives::U256;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lido_bindings::Network;
use lido_core::decode_call_script;
use lido_host::{run_on_fork, start_vote, voting::render_calls, Config, HttpRpc, VoteScript};
use lido_merkle::RewardsTree;
use serde_json::Value;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "omnibus", about = "Lido DAO omnibus vote tooling")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "OMNIBUS_LOG_LEVEL")]
    log_level: String,

    /// JSON-RPC endpoint, overrides `RPC_URL`.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Address book to use: "mainnet" or "holesky", overrides `NETWORK`.
    #[arg(long)]
    network: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List known vote scripts.
    List,
    /// Build, confirm and create a vote.
    Start {
        script: String,
        /// Skip the IPFS upload and the confirmation prompt.
        #[arg(long)]
        silent: bool,
    },
    /// Create, pass and execute a vote on a local fork.
    Fork {
        script: String,
        /// Roll the fork back once the vote is executed.
        #[arg(long)]
        revert: bool,
    },
    /// Decode a hex encoded EVM call script.
    Decode { script: String },
    /// Build a rewards tree from a `{ "nodeOperatorId": "shares" }` JSON file.
    RewardsTree { file: PathBuf },
}

fn find_script(name: &str) -> Result<&'static dyn VoteScript> {
    votes::find(name).ok_or_else(|| anyhow!("Unknown vote script {name}, see `omnibus list`"))
}

fn parse_shares(json: &Value) -> Result<BTreeMap<u64, U256>> {
    let Value::Object(entries) = json else {
        bail!("Expected an object of node operator ids to shares");
    };
    entries
        .iter()
        .map(|(id, shares)| {
            let id: u64 = id.parse().with_context(|| format!("Invalid node operator id {id}"))?;
            let shares = match shares {
                Value::String(s) => s.parse::<U256>().ok(),
                Value::Number(n) => n.as_u64().map(U256::from),
                _ => None,
            }
            .ok_or_else(|| anyhow!("Invalid shares of node operator {id}: {shares}"))?;
            Ok((id, shares))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level.parse::<Level>().unwrap_or(Level::INFO))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::from_env();
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(network) = cli.network.as_deref() {
        config.network = Network::from(network);
    }

    match cli.command {
        Command::List => {
            for script in votes::SCRIPTS {
                println!("{}", script.name());
            }
        }
        Command::Start { script, silent } => {
            let script = find_script(&script)?;
            info!("╔═══════════════════════════════════════════════╗");
            info!("║            Lido DAO omnibus vote              ║");
            info!("╚═══════════════════════════════════════════════╝");
            info!("  Script:  {}", script.name());
            info!("  Network: {}", config.network);
            info!("  RPC:     {}", config.rpc_url);
            info!("  Live:    {}", config.is_live);

            let rpc = HttpRpc::new(config.rpc_url.clone());
            let params = config.tx_params()?;
            if let Some((vote_id, _)) = start_vote(&rpc, &config, &params, script, silent).await? {
                println!("Vote created: {vote_id}.");
            }
        }
        Command::Fork { script, revert } => {
            let script = find_script(&script)?;
            info!("Replaying {} on fork {}", script.name(), config.rpc_url);

            let rpc = HttpRpc::new(config.rpc_url.clone());
            let vote_id = run_on_fork(&rpc, &config, script, revert).await?;
            println!("Vote #{vote_id} passed and executed.");
        }
        Command::Decode { script } => {
            let bytes = hex::decode(script.trim().trim_start_matches("0x")).context("Invalid hex")?;
            let calls = decode_call_script(&bytes)?;
            print!("{}", render_calls(&calls));
        }
        Command::RewardsTree { file } => {
            let content = std::fs::read_to_string(&file).with_context(|| format!("Reading {}", file.display()))?;
            let shares = parse_shares(&serde_json::from_str(&content)?)?;
            let tree = RewardsTree::from_shares(&shares)?;

            info!("Rewards tree of {} node operators", shares.len());
            println!("root: {}", tree.root());
            println!("{}", serde_json::to_string_pretty(&tree.dump())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_shares() {
        let shares = parse_shares(&json!({ "0": "1000", "7": 25 })).unwrap();
        assert_eq!(shares[&0], U256::from(1000u64));
        assert_eq!(shares[&7], U256::from(25u64));

        assert!(parse_shares(&json!({ "x": "1" })).is_err());
        assert!(parse_shares(&json!({ "1": true })).is_err());
        assert!(parse_shares(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["omnibus", "--network", "holesky", "start", "vote_2025_12_19", "--silent"]).unwrap();
        assert_eq!(cli.network.as_deref(), Some("holesky"));
        assert!(matches!(cli.command, Command::Start { silent: true, .. }));
    }
}
