//! Retarget protocol: verify a candidate link, then commit it or roll back.
//!
//! The setting and the link it was derived from change together. A failed
//! check restores both to their values from before the change.

use sploit_types::error::{Result, SploitError};
use sploit_types::link::LinkDescriptor;
use sploit_types::services::ReachabilityChecker;
use sploit_types::session::Session;

/// Environment variable carrying the confirmed target host.
pub const HOST_VAR: &str = "HOST";

/// What a failed retarget puts back.
#[derive(Debug, Clone)]
pub struct Rollback {
    pub setting: String,
    /// Previous value; `None` when the setting did not exist.
    pub value: Option<String>,
    pub link: LinkDescriptor,
}

/// Check `session.link` (already rebuilt from the new settings).
///
/// On success the link hash becomes the confirmed one. On failure the
/// setting and link in `rollback` are restored and a connectivity error
/// is returned.
pub fn retarget(
    session: &mut Session,
    checker: &dyn ReachabilityChecker,
    rollback: Rollback,
) -> Result<()> {
    match checker.check(&session.link) {
        Ok(()) => {
            session.link_hash = Some(session.link.hash.clone());
            if let Some(host) = &session.link.host {
                session.env.insert(HOST_VAR.to_string(), host.clone());
            }
            log::info!(
                "retargeted to {} (link {})",
                session.link.url.as_deref().unwrap_or("-"),
                session.link.short_hash()
            );
            Ok(())
        },
        Err(e) => {
            log::warn!("retarget failed, keeping link {}: {e}", rollback.link.short_hash());
            session.link = rollback.link;
            match &rollback.value {
                Some(old) => session.settings.insert(&rollback.setting, old),
                None => session.settings.remove(&rollback.setting),
            };
            Err(match e {
                SploitError::Connectivity(msg) => SploitError::Connectivity(msg),
                other => SploitError::Connectivity(other.to_string()),
            })
        },
    }
}
