//! Core business logic modules
//!
//! This module contains the dataset validation state machine, the
//! runnability resolver, and run aggregation. No I/O happens here; all
//! functions are deterministic and easily testable.

pub mod records;
pub mod run;
pub mod runnability;

pub use records::{ValidationProgress, WorkspaceState};
pub use runnability::Partition;
