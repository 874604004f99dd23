//! Collaborator contracts the shell depends on.
//!
//! Each collaborator is a narrow trait so the shell can be driven by the
//! real implementations (`SettingRules`, `StdLinkBuilder`, the HTTP checker
//! in `sploit-net`, `SessionFile`) or by test doubles.

use std::path::PathBuf;

use crate::error::Result;
use crate::link::LinkDescriptor;
use crate::session::Session;
use crate::settings::Settings;

/// Decides whether a complete settings mapping is acceptable.
///
/// Pure function over the whole mapping: there is no notion of a single
/// invalid key.
pub trait Validator {
    fn validate(&self, settings: &Settings) -> bool;
}

impl<F> Validator for F
where
    F: Fn(&Settings) -> bool,
{
    fn validate(&self, settings: &Settings) -> bool {
        self(settings)
    }
}

/// Derives a [`LinkDescriptor`] from the settings. Deterministic and
/// side-effect free.
pub trait LinkBuilder {
    fn build(&self, settings: &Settings) -> LinkDescriptor;
}

/// Verifies that the remote endpoint described by a link answers.
///
/// May perform blocking network I/O bounded by its own timeout. `Ok(())`
/// means reachable; the error explains why it is not.
pub trait ReachabilityChecker {
    fn check(&self, link: &LinkDescriptor) -> Result<()>;
}

/// Writes a session somewhere durable.
pub trait SessionPersistence {
    /// Save `session` using `hint` (possibly empty) to pick the destination.
    /// Returns the path actually written.
    fn save(&self, session: &Session, hint: &str) -> Result<PathBuf>;
}
