//! Shared types for the audit run orchestration engine
//!
//! Contains the domain data model, shared error type, and logging
//! utilities. Engine-internal types (collaborator traits, run options)
//! live in the engine crate.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
