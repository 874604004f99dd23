//! User configuration file (TOML).
//!
//! ```toml
//! plugins = "/opt/sploit/plugins.toml"
//! locked_settings = ["PASSKEY"]
//! locked_env = []
//!
//! [settings]
//! TARGET = "http://example.com/index.php"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SploitError};
use crate::services::{LinkBuilder, Validator};
use crate::session::Session;
use crate::settings::{SettingRules, Settings};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "SPLOIT_CONFIG";

/// Parsed user configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellConfig {
    /// Settings layered over the built-in defaults.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub locked_settings: Vec<String>,
    #[serde(default)]
    pub locked_env: Vec<String>,
    /// Plugin manifest to load, if any.
    #[serde(default)]
    pub plugins: Option<PathBuf>,
}

impl ShellConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| SploitError::Config(format!("config.toml: {e}")))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SploitError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/sploit/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sploit").join("config.toml"))
    }

    /// Locate and load the configuration.
    ///
    /// An explicit path (CLI argument or `SPLOIT_CONFIG`) must exist; a
    /// missing default file just yields the defaults.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        let explicit = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = explicit {
            return Self::load(&path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Merge the defaults with this config and build the session.
    ///
    /// The merged mapping must pass `validator`.
    pub fn into_session(
        self,
        validator: &dyn Validator,
        links: &dyn LinkBuilder,
    ) -> Result<Session> {
        let mut settings = Settings::defaults();
        settings.merge(self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if !validator.validate(&settings) {
            let reason = SettingRules
                .check(&settings)
                .err()
                .unwrap_or_else(|| "rejected by validator".to_string());
            return Err(SploitError::Validation(reason));
        }

        let mut session = Session::new(settings, links);
        for name in &self.locked_settings {
            session.lock_setting(name);
        }
        for name in &self.locked_env {
            session.lock_env(name);
        }
        Ok(session)
    }
}
