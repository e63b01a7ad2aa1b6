//! Test helpers and builder patterns for engine tests
//!
//! This module provides a workspace builder over mockall collaborators and
//! a couple of purpose-built test doubles for timing-sensitive scenarios.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use engine::services::JsonCatalog;
use engine::traits::{
    MockContentValidator, MockDatasetTransfer, MockFindingStore, MockQueryExecutor,
};
use engine::{
    AuditWorkspace, ContentValidator, DatasetTransfer, EngineResult, FindingStore, QueryExecutor,
    ValidationOutcome,
};
use shared::{DatasetKind, DatasetRecord, RawFindingRow, Rule};

use super::fixtures::TestFixtures;

pub type TestWorkspace = AuditWorkspace<
    MockDatasetTransfer,
    MockContentValidator,
    MockQueryExecutor,
    MockFindingStore,
    JsonCatalog,
>;

/// Builder for test workspaces with sensible mock defaults: transfers
/// succeed, validation accepts, queries return no rows, inserts succeed.
/// Configuring a collaborator replaces its default entirely.
pub struct WorkspaceBuilder {
    kinds: Vec<DatasetKind>,
    rules: Vec<Rule>,
    transfer: MockDatasetTransfer,
    validator: MockContentValidator,
    executor: MockQueryExecutor,
    store: MockFindingStore,
    default_transfer: bool,
    default_validator: bool,
    default_executor: bool,
    default_store: bool,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self {
            kinds: TestFixtures::dataset_kinds(),
            rules: TestFixtures::rules(),
            transfer: MockDatasetTransfer::new(),
            validator: MockContentValidator::new(),
            executor: MockQueryExecutor::new(),
            store: MockFindingStore::new(),
            default_transfer: true,
            default_validator: true,
            default_executor: true,
            default_store: true,
        }
    }

    pub fn with_kinds(mut self, kinds: Vec<DatasetKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Configure the transfer mock; disables the accept-everything default
    pub fn with_transfer<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockDatasetTransfer),
    {
        setup(&mut self.transfer);
        self.default_transfer = false;
        self
    }

    /// Configure the validator mock; disables the accept-everything default
    pub fn with_validator<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockContentValidator),
    {
        setup(&mut self.validator);
        self.default_validator = false;
        self
    }

    /// Configure the executor mock; disables the empty-result default
    pub fn with_executor<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockQueryExecutor),
    {
        setup(&mut self.executor);
        self.default_executor = false;
        self
    }

    /// Configure the store mock; disables the always-succeed default
    pub fn with_store<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockFindingStore),
    {
        setup(&mut self.store);
        self.default_store = false;
        self
    }

    pub async fn build(mut self) -> TestWorkspace {
        if self.default_transfer {
            self.transfer
                .expect_transfer()
                .returning(|_, _, _| Ok(PathBuf::from("staged")))
                .times(0..);
        }
        if self.default_validator {
            self.validator
                .expect_validate()
                .returning(|_, _| Ok(ValidationOutcome::accept()))
                .times(0..);
        }
        if self.default_executor {
            self.executor
                .expect_execute()
                .returning(|_, _| Ok(Vec::new()))
                .times(0..);
        }
        if self.default_store {
            self.store
                .expect_insert_findings()
                .returning(|_, _, _| Ok(()))
                .times(0..);
        }

        let catalog = JsonCatalog::from_parts(self.kinds, self.rules);
        AuditWorkspace::open(
            TestFixtures::audit(),
            self.transfer,
            self.validator,
            self.executor,
            self.store,
            catalog,
        )
        .await
        .expect("failed to open test workspace")
    }
}

/// Helper functions shared across test suites
pub struct TestHelpers;

impl TestHelpers {
    pub fn selection(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    /// Drive the given kinds through the full upload/validation pipeline
    /// and wait until every record settles
    pub async fn validate_kinds(workspace: &TestWorkspace, kind_names: &[&str]) {
        for name in kind_names {
            let record_id = workspace
                .record_id_for_kind(name)
                .await
                .unwrap_or_else(|| panic!("unknown kind {name}"));
            workspace
                .begin_upload(record_id, PathBuf::from(format!("{name}.src")))
                .await
                .expect("begin_upload failed");
        }
        Self::wait_settled(workspace).await;
    }

    /// Poll until no upload or validation is in flight
    pub async fn wait_settled(
        workspace: &AuditWorkspace<
            impl DatasetTransfer + 'static,
            impl ContentValidator + 'static,
            impl QueryExecutor,
            impl FindingStore,
            impl engine::CatalogSource,
        >,
    ) {
        for _ in 0..1000 {
            if !workspace.has_inflight().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("records never settled");
    }
}

/// Transfer double that parks until released, keeping its record in the
/// Uploading state for as long as the test needs
pub struct GatedTransfer {
    release: Arc<Notify>,
}

impl GatedTransfer {
    pub fn new() -> (Self, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        (
            Self {
                release: Arc::clone(&release),
            },
            release,
        )
    }
}

#[async_trait::async_trait]
impl DatasetTransfer for GatedTransfer {
    async fn transfer(
        &self,
        _record: &DatasetRecord,
        _source: &Path,
        progress: mpsc::Sender<f32>,
    ) -> EngineResult<PathBuf> {
        let _ = progress.send(0.5).await;
        self.release.notified().await;
        Ok(PathBuf::from("gated-staged"))
    }
}

/// Executor double whose every query takes a fixed amount of time
pub struct SlowExecutor {
    pub delay: Duration,
}

#[async_trait::async_trait]
impl QueryExecutor for SlowExecutor {
    async fn execute(&self, _logic: &str, _audit_id: &str) -> EngineResult<Vec<RawFindingRow>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
