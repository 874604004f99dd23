//! Foundation types for sploit.
//!
//! This crate holds the state the shell operates on and the contracts of
//! the collaborators it talks to: the settings store and its validator,
//! the derived link descriptor, the session aggregate, configuration
//! loading, session persistence and the error type.

pub mod config;
pub mod error;
pub mod link;
pub mod persist;
pub mod services;
pub mod session;
pub mod settings;
