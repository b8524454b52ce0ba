//! Creating DAO votes from vote items

use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use alloy_primitives::U256;
use anyhow::{anyhow, bail, ensure, Context, Result};
use lido_bindings::{aragon::START_VOTE_TOPIC, signatures, Contracts};
use lido_core::{
    abi::Formatted, decode_call_script, encode_call_script, is_call_script, CallScriptItem, DynSolValue, EMPTY_CALLSCRIPT,
};
use tracing::{error, info, warn};

use crate::ipfs::{make_lido_vote_cid, IpfsDescription, Severity};
use crate::rpc::{transact, EthRpc, Receipt, TxParams};

/// Described calls of a vote, in execution order
pub type VoteItems = Vec<(String, CallScriptItem)>;

/// Pair descriptions with calls; every description must be unique
pub fn bake_vote_items(descriptions: Vec<String>, calls: Vec<CallScriptItem>) -> Result<VoteItems> {
    ensure!(
        descriptions.len() == calls.len(),
        "Got {} descriptions for {} calls",
        descriptions.len(),
        calls.len()
    );

    let mut seen = HashSet::new();
    for description in &descriptions {
        ensure!(seen.insert(description.as_str()), "Duplicate vote item description: {description}");
    }

    Ok(descriptions.into_iter().zip(calls).collect())
}

/// On-chain metadata of a vote
pub fn vote_description(items: &[(String, CallScriptItem)], cid: &str) -> String {
    let descriptions: Vec<&str> = items.iter().map(|(d, _)| d.as_str()).collect();
    let mut text = format!("Omnibus vote: {}.", descriptions.join(";\n"));

    let link = make_lido_vote_cid(cid);
    if !link.is_empty() {
        text.push('\n');
        text.push_str(&link);
    }
    text
}

/// Open a vote through the token manager and return its id
pub async fn create_vote(
    rpc: &dyn EthRpc,
    contracts: &Contracts,
    items: &[(String, CallScriptItem)],
    params: &TxParams,
    desc_ipfs: Option<&IpfsDescription>,
) -> Result<(U256, Receipt)> {
    let calls: Vec<CallScriptItem> = items.iter().map(|(_, call)| call.clone()).collect();
    let script = if calls.is_empty() {
        EMPTY_CALLSCRIPT.to_vec()
    } else {
        encode_call_script(&calls)?.to_vec()
    };

    let cid = desc_ipfs.map(|d| d.cid.as_str()).unwrap_or_default();
    let description = vote_description(items, cid);

    let new_vote = contracts.voting().new_vote(&script, &description, false, false);
    let forward = contracts
        .token_manager()
        .forward(&encode_call_script(std::slice::from_ref(&new_vote))?);

    info!("Creating vote with {} items from {}", items.len(), params.from);
    let receipt = transact(rpc, params, &forward).await?;

    let vote_id = receipt
        .logs_with_topic(START_VOTE_TOPIC)
        .find_map(|log| log.topics.get(1))
        .map(|topic| U256::from_be_bytes(topic.0))
        .ok_or_else(|| anyhow!("No StartVote event in transaction {}", receipt.tx_hash))?;

    info!("Vote #{vote_id} created in block {}", receipt.block_number);
    Ok((vote_id, receipt))
}

/// Human readable tree of a vote script, nested scripts expanded
pub fn render_vote_script(items: &[(String, CallScriptItem)]) -> String {
    let mut out = String::new();
    for (i, (description, call)) in items.iter().enumerate() {
        let _ = writeln!(out, "Point #{}: {description}", i + 1);
        render_call(&mut out, call, 1);
    }
    out
}

/// Decoded tree of bare calls
pub fn render_calls(calls: &[CallScriptItem]) -> String {
    let mut out = String::new();
    for call in calls {
        render_call(&mut out, call, 0);
    }
    out
}

fn render_call(out: &mut String, call: &CallScriptItem, depth: usize) {
    let indent = "    ".repeat(depth);
    let Some((signature, args)) = signatures::decode(call) else {
        let _ = writeln!(out, "{indent}{call}");
        return;
    };

    let _ = writeln!(out, "{indent}{}: {signature}", call.target);
    for arg in &args {
        match arg {
            DynSolValue::Bytes(script) if is_call_script(script) => match decode_call_script(script) {
                Ok(nested) => nested.iter().for_each(|c| render_call(out, c, depth + 1)),
                Err(_) => {
                    let _ = writeln!(out, "{indent}  {}", Formatted(arg));
                }
            },
            DynSolValue::Array(calls) if signature.starts_with("submitProposal(") => {
                for proposal_call in calls {
                    match proposal_call.as_tuple() {
                        Some([DynSolValue::Address(target), _, DynSolValue::Bytes(calldata)]) => {
                            render_call(out, &CallScriptItem::new(*target, calldata.clone()), depth + 1);
                        }
                        _ => {
                            let _ = writeln!(out, "{indent}  {}", Formatted(proposal_call));
                        }
                    }
                }
            }
            _ => {
                let _ = writeln!(out, "{indent}  {}", Formatted(arg));
            }
        }
    }
}

fn prompt_bool(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<bool> {
    loop {
        write!(output, "{question} [yes/no]: ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            bail!("No answer on stdin");
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please answer yes or no")?,
        }
    }
}

/// Show the script and its description findings, then ask whether to go on
pub fn confirm_vote_script(
    items: &[(String, CallScriptItem)],
    silent: bool,
    desc_ipfs: Option<&IpfsDescription>,
) -> Result<bool> {
    info!("Vote script:\n{}", render_vote_script(items));

    if let Some(desc) = desc_ipfs {
        info!("IPFS description CID: {}", desc.cid);
        for message in &desc.messages {
            match message.severity {
                Severity::Warning => warn!("{}", message.text),
                Severity::Error => error!("{}", message.text),
            }
        }
    }

    if silent {
        return Ok(true);
    }

    let stdin = io::stdin();
    prompt_bool(&mut stdin.lock(), &mut io::stdout(), "Does it look good?").context("Reading confirmation")
}
