//! The session aggregate every command operates on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::link::LinkDescriptor;
use crate::services::LinkBuilder;
use crate::settings::Settings;

/// Settings, the link derived from them and the remote environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub settings: Settings,
    /// Current link, rebuilt from `settings` after every accepted change.
    pub link: LinkDescriptor,
    /// Hash of the last link the remote end confirmed.
    pub link_hash: Option<String>,
    /// Remote environment variables.
    pub env: BTreeMap<String, String>,
    /// Settings the user may not change. Append-only.
    locked_settings: Vec<String>,
    /// Environment variables the user may not change. Append-only.
    locked_env: Vec<String>,
}

impl Session {
    /// Create a session over `settings`, deriving its first link.
    pub fn new(settings: Settings, links: &dyn LinkBuilder) -> Self {
        let link = links.build(&settings);
        Self {
            settings,
            link,
            link_hash: None,
            env: BTreeMap::new(),
            locked_settings: Vec::new(),
            locked_env: Vec::new(),
        }
    }

    /// Block user mutation of a setting for the rest of the session.
    pub fn lock_setting(&mut self, name: &str) {
        let name = name.to_ascii_uppercase();
        if !self.locked_settings.contains(&name) {
            self.locked_settings.push(name);
        }
    }

    /// Block user mutation of an environment variable for the rest of the session.
    pub fn lock_env(&mut self, name: &str) {
        let name = name.to_ascii_uppercase();
        if !self.locked_env.contains(&name) {
            self.locked_env.push(name);
        }
    }

    pub fn is_setting_locked(&self, name: &str) -> bool {
        let name = name.to_ascii_uppercase();
        self.locked_settings.contains(&name)
    }

    pub fn is_env_locked(&self, name: &str) -> bool {
        let name = name.to_ascii_uppercase();
        self.locked_env.contains(&name)
    }

    pub fn locked_settings(&self) -> &[String] {
        &self.locked_settings
    }

    pub fn locked_env(&self) -> &[String] {
        &self.locked_env
    }

    /// Whether the current link is the one the remote end last confirmed.
    pub fn link_confirmed(&self) -> bool {
        self.link_hash.as_deref() == Some(self.link.hash.as_str())
    }
}
