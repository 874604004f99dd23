//! Link descriptor: how to reach the remote target.
//!
//! A link is derived from the full settings mapping and never edited in
//! place; a settings change produces a new descriptor. The identity `hash`
//! tells whether two descriptors denote the same reachable target.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::services::LinkBuilder;
use crate::settings::{
    BACKDOOR, PASSKEY, PASSKEY_PLACEHOLDER, REQ_TIMEOUT, REQ_USER_AGENT, Settings, TARGET,
};

/// Timeout used when `REQ_TIMEOUT` does not parse.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Read-only snapshot of the connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    /// Normalized target URL, `None` while no usable TARGET is set.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Header name carrying the probe / payload code.
    pub passkey: String,
    /// Payload to plant on the target, passkey already substituted.
    pub backdoor: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Hex SHA-256 over the target URL and passkey.
    pub hash: String,
}

impl LinkDescriptor {
    /// Whether the link points at a target at all.
    pub fn is_bound(&self) -> bool {
        self.url.is_some()
    }

    /// First 8 hex digits of the identity hash.
    pub fn short_hash(&self) -> &str {
        self.hash_prefix(8)
    }

    /// Marker the backdoor is asked to echo back during a reachability probe.
    pub fn probe_token(&self) -> String {
        format!("sploit:{}", self.hash_prefix(16))
    }

    /// Up to `n` leading characters of the hash.
    fn hash_prefix(&self, n: usize) -> &str {
        match self.hash.char_indices().nth(n) {
            Some((end, _)) => &self.hash[..end],
            None => &self.hash,
        }
    }
}

/// The stock [`LinkBuilder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdLinkBuilder;

impl LinkBuilder for StdLinkBuilder {
    fn build(&self, settings: &Settings) -> LinkDescriptor {
        build_link(settings)
    }
}

/// Derive a link from `settings`.
pub fn build_link(settings: &Settings) -> LinkDescriptor {
    let target = Url::parse(settings.value(TARGET))
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some());

    let passkey = settings.value(PASSKEY).to_string();
    let backdoor = settings
        .value(BACKDOOR)
        .replace(PASSKEY_PLACEHOLDER, &passkey.to_ascii_uppercase());
    let timeout_secs = settings
        .value(REQ_TIMEOUT)
        .parse()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let url = target.as_ref().map(|u| u.as_str().to_string());
    let hash = link_hash(url.as_deref().unwrap_or(""), &passkey);

    LinkDescriptor {
        host: target.as_ref().and_then(|u| u.host_str().map(str::to_string)),
        port: target.as_ref().and_then(Url::port_or_known_default),
        url,
        passkey,
        backdoor,
        user_agent: settings.value(REQ_USER_AGENT).to_string(),
        timeout_secs,
        hash,
    }
}

fn link_hash(url: &str, passkey: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(passkey.as_bytes());
    hex::encode(hasher.finalize())
}
