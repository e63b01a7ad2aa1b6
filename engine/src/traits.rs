//! Trait definitions with mockall annotations for testing
//!
//! Every external collaborator of the run orchestration core is reached
//! through one of these traits. They are used for dependency injection and
//! enable comprehensive testing against mocks.

use std::path::{Path, PathBuf};

use shared::{DatasetKind, DatasetRecord, Finding, RawFindingRow, Rule, RunId};
use tokio::sync::mpsc;

use crate::error::EngineResult;

/// Verdict returned by the content validator for an uploaded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error_message: Option<String>,
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self {
            valid: true,
            error_message: None,
        }
    }

    pub fn reject<M: Into<String>>(message: M) -> Self {
        Self {
            valid: false,
            error_message: Some(message.into()),
        }
    }
}

/// Upload transport abstraction
///
/// Moves a dataset file from the caller's source location into the
/// workspace. Transport mechanics are outside the orchestration core; the
/// engine only observes progress fractions and the final staged path.
#[mockall::automock]
#[async_trait::async_trait]
pub trait DatasetTransfer: Send + Sync {
    /// Transfer the source file for a record, reporting progress fractions
    /// in [0, 1] over the channel as the transfer advances.
    ///
    /// # Returns
    /// The staged path the validator should read the payload from
    async fn transfer(
        &self,
        record: &DatasetRecord,
        source: &Path,
        progress: mpsc::Sender<f32>,
    ) -> EngineResult<PathBuf>;
}

/// Content validation abstraction
///
/// Performs schema/structure checks on an uploaded payload. Dataset file
/// content is opaque to the engine beyond this collaborator's verdict.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContentValidator: Send + Sync {
    /// Validate the staged payload for a record
    async fn validate(
        &self,
        record: &DatasetRecord,
        staged_path: &Path,
    ) -> EngineResult<ValidationOutcome>;
}

/// Query execution abstraction for rule logic
///
/// Runs a rule's opaque logic descriptor against the backing store, scoped
/// to one audit. Implementations signal transport-level failure with
/// `EngineError::RunExecution` (fails the whole run) and query-level
/// failure with `EngineError::QueryFailed` (absorbed per rule).
#[mockall::automock]
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a logic descriptor scoped to `audit_id`
    ///
    /// # Returns
    /// Raw result rows; zero rows means the rule found nothing
    async fn execute(&self, logic: &str, audit_id: &str) -> EngineResult<Vec<RawFindingRow>>;
}

/// Persistence abstraction for detected findings
#[mockall::automock]
#[async_trait::async_trait]
pub trait FindingStore: Send + Sync {
    /// Batch-insert findings for an audit, all-or-nothing relative to the
    /// batch. Inserting zero rows is a no-op success. `run_id` identifies
    /// the producing run so the store can enforce per-run idempotency.
    async fn insert_findings(
        &self,
        audit_id: &str,
        run_id: RunId,
        findings: &[Finding],
    ) -> EngineResult<()>;
}

/// Read access to the rule and dataset catalogs
///
/// Reads return the current snapshot; the engine never caches catalog
/// content across operations.
#[mockall::automock]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Required dataset kinds for an audit
    async fn dataset_kinds(&self, audit_id: &str) -> EngineResult<Vec<DatasetKind>>;

    /// Full rule catalog
    async fn list_rules(&self) -> EngineResult<Vec<Rule>>;

    /// Rules for the given ids, in catalog order. Ids that no longer exist
    /// are silently dropped, not treated as errors.
    async fn rules_by_ids(&self, ids: &[String]) -> EngineResult<Vec<Rule>>;
}

/// Narrative analysis collaborator
///
/// Takes one finding and returns a free-text analyst report.
#[mockall::automock]
#[async_trait::async_trait]
pub trait FindingAnalyst: Send + Sync {
    async fn analyze(&self, finding: &Finding) -> EngineResult<String>;
}
