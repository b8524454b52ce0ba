//! Vote descriptions stored on IPFS
//!
//! A vote's on-chain metadata carries `lidovoteipfs://<cid>` where `<cid>` is
//! the CIDv1 (raw codec, sha2-256, base32 lowercase) of the description text.

use std::fmt;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{IpfsConfig, IpfsService};

pub const VOTE_CID_PREFIX: &str = "lidovoteipfs://";

/// CIDv1 header: version, raw codec, sha2-256, digest length
const CID_V1_RAW_SHA256: [u8; 4] = [0x01, 0x55, 0x12, 0x20];

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Finding about a description, shown before a vote is confirmed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

impl Message {
    fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.text),
            Severity::Error => write!(f, "error: {}", self.text),
        }
    }
}

/// Description text with its CID; `cid` is empty when there is none
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpfsDescription {
    pub cid: String,
    pub text: String,
    pub messages: Vec<Message>,
}

impl IpfsDescription {
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }
}

fn base32_lower(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer = 0u32;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
    }
    if bits > 0 {
        out.push(char::from(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    out
}

/// CIDv1 of `text` as a single raw block
pub fn calculate_cid_hash(text: &str) -> String {
    let mut bytes = CID_V1_RAW_SHA256.to_vec();
    bytes.extend_from_slice(&Sha256::digest(text.as_bytes()));
    format!("b{}", base32_lower(&bytes))
}

/// A token shape searched for in description text
struct Pattern {
    prefixes: &'static [&'static str],
    class: fn(char) -> bool,
    min: usize,
    max: usize,
    /// Trailing `=` allowed after the body
    padding: usize,
}

const fn is_base58(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

const fn is_base16ish(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | 'A'..='F')
}

const fn is_base32(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '2'..='7')
}

const fn is_base64(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/'
}

const fn is_base64_url(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

const fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

const ADDRESS: Pattern = Pattern {
    prefixes: &["0x"],
    class: is_hex,
    min: 40,
    max: 40,
    padding: 0,
};

const VOTE_CID: Pattern = Pattern {
    prefixes: &["b", "B"],
    class: is_base32,
    min: 58,
    max: 128,
    padding: 0,
};

/// Multibase encodings a CID may be written in, tried in order
const CIDS: [Pattern; 7] = [
    Pattern {
        prefixes: &["Qm"],
        class: is_base58,
        min: 44,
        max: 128,
        padding: 0,
    },
    Pattern {
        prefixes: &["f", "F"],
        class: is_base16ish,
        min: 50,
        max: 128,
        padding: 0,
    },
    VOTE_CID,
    Pattern {
        prefixes: &["z"],
        class: is_base58,
        min: 48,
        max: 128,
        padding: 0,
    },
    Pattern {
        prefixes: &["m"],
        class: is_base64,
        min: 40,
        max: 128,
        padding: 0,
    },
    Pattern {
        prefixes: &["u"],
        class: is_base64_url,
        min: 40,
        max: 128,
        padding: 0,
    },
    Pattern {
        prefixes: &["U"],
        class: is_base64_url,
        min: 40,
        max: 128,
        padding: 3,
    },
];

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary(chars: &[char], at: usize) -> bool {
    let before = at > 0 && chars.get(at - 1).copied().is_some_and(is_word);
    let after = chars.get(at).copied().is_some_and(is_word);
    before != after
}

fn starts_with(chars: &[char], at: usize, prefix: &str) -> bool {
    let mut i = at;
    for c in prefix.chars() {
        if chars.get(i) != Some(&c) {
            return false;
        }
        i += 1;
    }
    true
}

impl Pattern {
    /// End of the longest match starting at `start` that ends on a word boundary
    fn match_at(&self, chars: &[char], start: usize) -> Option<usize> {
        for prefix in self.prefixes {
            if !starts_with(chars, start, prefix) {
                continue;
            }
            let body = start + prefix.chars().count();
            let run = chars[body..]
                .iter()
                .take(self.max)
                .take_while(|c| (self.class)(**c))
                .count();
            for len in (self.min..=run).rev() {
                let end = body + len;
                let pads = chars[end..]
                    .iter()
                    .take(self.padding)
                    .take_while(|c| **c == '=')
                    .count();
                if let Some(end) = (0..=pads).rev().map(|k| end + k).find(|&e| is_boundary(chars, e)) {
                    return Some(end);
                }
            }
        }
        None
    }

    fn matches_exactly(&self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        !chars.is_empty() && self.match_at(&chars, 0) == Some(chars.len())
    }
}

/// Tokens matching any of `patterns` not wrapped in backticks on both sides
fn find_unquoted(text: &str, patterns: &[Pattern]) -> Vec<String> {
    let chars: Vec<char> = format!(" {text} ").chars().collect();
    let mut found = Vec::new();
    let mut i = 1;
    while i < chars.len() {
        let matched = if is_boundary(&chars, i) {
            patterns.iter().find_map(|p| p.match_at(&chars, i))
        } else {
            None
        };
        match matched {
            Some(end) => {
                let quoted = chars[i - 1] == '`' && chars.get(end) == Some(&'`');
                if !quoted {
                    found.push(chars[i..end].iter().collect());
                }
                i = end.max(i + 1);
            }
            None => i += 1,
        }
    }
    found
}

/// Check a description for an empty text and for addresses and CIDs not
/// formatted as inline code
pub fn verify_ipfs_description(text: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    if text.is_empty() {
        messages.push(Message::error(
            "You provide an empty ipfs description. A good description will make voting decisions easier for users.",
        ));
    }

    let addresses = find_unquoted(text, std::slice::from_ref(&ADDRESS));
    if !addresses.is_empty() {
        messages.push(Message::warning(format!(
            "You have ETH addresses in description which has no Markdown. You could use inline code block for it. You need use '`' before and after address. Here is the list of addresses: <{}>.",
            addresses.join(">, <")
        )));
    }

    let cids = find_unquoted(text, &CIDS);
    if !cids.is_empty() {
        messages.push(Message::warning(format!(
            "You have CID in description which has no Markdown. You could use inline code block for it. You need use '`' before and after address. Here is the list of CIDs: <{}>.",
            cids.join(">, <")
        )));
    }
    messages
}

/// `lidovoteipfs://<cid>`, or an empty string when `cid` is not a base32 CIDv1
pub fn make_lido_vote_cid(cid: &str) -> String {
    if VOTE_CID.matches_exactly(cid) {
        format!("{VOTE_CID_PREFIX}{cid}")
    } else {
        String::new()
    }
}

/// CID of a vote description referenced at the end of `text`
pub fn get_lido_vote_cid_from_str(text: &str) -> String {
    let text = text.trim_end();
    let Some(pos) = text.rfind(VOTE_CID_PREFIX) else {
        return String::new();
    };
    if text[..pos].chars().next_back().is_some_and(is_word) {
        return String::new();
    }
    let cid = &text[pos + VOTE_CID_PREFIX.len()..];
    if VOTE_CID.matches_exactly(cid) {
        cid.to_string()
    } else {
        String::new()
    }
}

/// Description with its calculated CID, without touching the network
pub fn calculate_vote_ipfs_description(text: &str) -> IpfsDescription {
    let messages = verify_ipfs_description(text);
    let cid = if text.is_empty() {
        String::new()
    } else {
        calculate_cid_hash(text)
    };
    IpfsDescription {
        cid,
        text: text.to_string(),
        messages,
    }
}

/// HTTP status of `cid` from whichever gateway answers first
pub async fn fetch_cid_status(client: &reqwest::Client, cid: &str) -> Result<u16> {
    if cid.is_empty() {
        return Ok(404);
    }

    let gateway = client.get(format!("https://{cid}.ipfs.w3s.link")).send();
    let status_api = client.get(format!("https://api.web3.storage/status/{cid}")).send();
    let response = tokio::select! {
        response = gateway => response,
        response = status_api => response,
    }?;
    Ok(response.status().as_u16())
}

async fn upload_to_web3_storage(client: &reqwest::Client, config: &IpfsConfig, text: &str) -> Result<String> {
    let token = config
        .web3_storage_token
        .as_deref()
        .context("WEB3_STORAGE_TOKEN is not set")?;
    let response: Value = client
        .post("https://api.web3.storage/upload")
        .bearer_auth(token)
        .header("Content-Type", "application/x-directory")
        .body(text.to_string())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    response["cid"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No cid in web3.storage response"))
}

async fn upload_to_infura(client: &reqwest::Client, config: &IpfsConfig, text: &str) -> Result<String> {
    let project_id = config
        .infura_project_id
        .as_deref()
        .context("WEB3_INFURA_IPFS_PROJECT_ID is not set")?;
    let form = Form::new().part("file", Part::bytes(text.as_bytes().to_vec()).file_name("file"));
    let response: Value = client
        .post("https://ipfs.infura.io:5001/api/v0/add?cid-version=1")
        .basic_auth(project_id, config.infura_project_secret.as_deref())
        .multipart(form)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    response["Hash"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No Hash in infura response"))
}

pub async fn upload_str_to_ipfs(client: &reqwest::Client, config: &IpfsConfig, text: &str) -> Result<String> {
    match config.service {
        IpfsService::Web3Storage => upload_to_web3_storage(client, config, text).await,
        IpfsService::Infura => upload_to_infura(client, config, text).await,
    }
}

/// Make sure the description is on IPFS under its calculated CID
///
/// Network failures do not abort: they are reported as messages and the
/// calculated CID is kept so the text can be uploaded later.
pub async fn upload_vote_ipfs_description(config: &IpfsConfig, text: &str) -> IpfsDescription {
    let mut description = calculate_vote_ipfs_description(text);
    if text.is_empty() {
        return description;
    }

    let client = reqwest::Client::new();
    let calculated = description.cid.clone();
    let uploaded = async {
        let status = fetch_cid_status(&client, &calculated).await?;
        if status < 400 {
            debug!("Description {calculated} is already on IPFS");
            return Ok(calculated.clone());
        }
        upload_str_to_ipfs(&client, config, text).await
    }
    .await;

    match uploaded {
        Ok(cid) if cid == calculated => info!("Description uploaded to IPFS: {cid}"),
        Ok(cid) => description.messages.push(Message::error(format!(
            "The calculated description CID hashsum differs from the uploaded CID. Calculated CID is {calculated}, but uploaded is {cid}"
        ))),
        Err(err) => {
            description
                .messages
                .push(Message::error(format!("Unexpected error during upload process: '{err}'")));
            description.messages.push(Message::error(format!(
                "We was unable to upload the description to IPFS, but you could use calculated CID: {calculated} and upload description later."
            )));
        }
    }
    description
}
