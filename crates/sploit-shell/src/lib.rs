//! Command shell subsystem.
//!
//! A shell is a registration table built once at construction: core
//! commands present in every shell, commands specific to the shell variant
//! (main or remote), and an optional plugin registry. The dispatcher
//! resolves a command name against those tiers and runs the handler with the
//! session context.

mod core_commands;
mod eval;
pub mod help;
mod interpreter;
pub mod manual;
pub mod plugins;
pub mod retarget;
mod settings_commands;
mod shell_commands;
#[cfg(test)]
mod test_support;

/// Register the commands every shell carries.
pub use core_commands::register_core_commands;
/// Expand `eval` arguments into the text to resubmit.
pub use eval::expand_args;
/// Help record attached to a command.
pub use help::Help;
/// A single executable command trait.
pub use interpreter::Command;
/// Output produced by a command (text, signals).
pub use interpreter::CommandOutput;
/// Per-invocation session context handed to every command.
pub use interpreter::Context;
/// Registry tier selector for `get_commands`.
pub use interpreter::Scope;
/// Collaborators reachable from a command.
pub use interpreter::Services;
/// Command registry with dispatch.
pub use interpreter::Shell;
/// Which shell variant a registry belongs to.
pub use interpreter::ShellKind;
/// Split and tokenize command lines.
pub use interpreter::{split_units, tokenize};
/// Plugin catalog contract and the manifest-backed implementation.
pub use plugins::{PluginCatalog, PluginEntry, PluginRegistry};
/// Change a setting with validation and link rebuild.
pub use settings_commands::set_var;
/// Register the variant-specific commands (exploit / env).
pub use shell_commands::register_shell_commands;
