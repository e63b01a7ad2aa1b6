//! Service implementations
//!
//! This module contains real implementations of the collaborator traits.
//! These are the production implementations that handle actual I/O
//! operations.

pub mod analyst;
pub mod catalog;
pub mod store;
pub mod transfer;
pub mod validator;

// Re-export all service implementations
pub use analyst::GeminiAnalyst;
pub use catalog::JsonCatalog;
pub use store::RestStore;
pub use transfer::StagedTransfer;
pub use validator::StructuralValidator;
