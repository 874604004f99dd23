//! Error types for sploit.

use std::io;

/// Errors produced by the sploit shell and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SploitError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("locked session setting: {0}")]
    LockedSetting(String),

    #[error("locked environment variable: {0}")]
    LockedEnv(String),

    #[error("invalid settings: {0}")]
    Validation(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("eval error: '{path}': {source}")]
    Eval {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SploitError>;
