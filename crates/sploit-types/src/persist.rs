//! JSON session files.
//!
//! Destination rules for a save hint:
//! - empty: `$SAVEPATH/sploit.session`
//! - an existing directory, or anything ending in `/`: `<dir>/sploit.session`
//! - a bare file name: `$SAVEPATH/<name>`
//! - anything else: used as given

use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::error::{Result, SploitError};
use crate::services::SessionPersistence;
use crate::session::Session;
use crate::settings::SAVEPATH;

/// File name used when the hint does not name one.
pub const DEFAULT_SESSION_FILE: &str = "sploit.session";

/// The stock [`SessionPersistence`]: pretty-printed JSON on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFile;

impl SessionFile {
    /// Resolve where a save with `hint` would land.
    pub fn destination(session: &Session, hint: &str) -> PathBuf {
        let save_path = PathBuf::from(session.settings.value(SAVEPATH));
        if hint.is_empty() {
            return save_path.join(DEFAULT_SESSION_FILE);
        }
        let path = Path::new(hint);
        if path.is_dir() || hint.ends_with('/') || hint.ends_with(MAIN_SEPARATOR) {
            return path.join(DEFAULT_SESSION_FILE);
        }
        if path.parent().is_none_or(|p| p.as_os_str().is_empty()) {
            return save_path.join(hint);
        }
        path.to_path_buf()
    }

    /// Read a session previously written by [`SessionPersistence::save`].
    pub fn load(path: &Path) -> Result<Session> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| SploitError::Session(format!("{}: {e}", path.display())))
    }
}

impl SessionPersistence for SessionFile {
    fn save(&self, session: &Session, hint: &str) -> Result<PathBuf> {
        let dest = Self::destination(session, hint);
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&dest, json)?;
        log::info!("session saved to {}", dest.display());
        Ok(dest)
    }
}
