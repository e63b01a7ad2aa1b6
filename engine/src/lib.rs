//! Audit run orchestration engine
//!
//! This library coordinates one audit workspace: per-dataset upload and
//! validation with retry semantics, runnability resolution over the rule
//! catalog, and supervised execution of a chosen rule subset with atomic
//! persistence of the findings.

pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod workspace;

// Re-export commonly used types
pub use crate::core::{Partition, ValidationProgress, WorkspaceState};
pub use error::{EngineError, EngineResult};
pub use traits::{
    CatalogSource, ContentValidator, DatasetTransfer, FindingAnalyst, FindingStore, QueryExecutor,
    ValidationOutcome,
};
pub use workspace::{AuditWorkspace, RunOptions, WorkspaceEvent};
