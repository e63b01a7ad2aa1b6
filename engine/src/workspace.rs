//! Audit workspace controller
//!
//! Composes the dataset validation state machine, the runnability
//! resolver, and the run engine for one active audit. Every external
//! collaborator is injected through the traits in [`crate::traits`]; this
//! controller holds no business logic beyond sequencing.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;

use shared::{
    audit_debug, audit_error, audit_info, Audit, DatasetRecord, DatasetStatus, RecordId, Rule,
    RunId, RunResult,
};

use crate::core::records::{ValidationProgress, WorkspaceState};
use crate::core::run::{self, RuleExecution};
use crate::core::runnability::{self, Partition};
use crate::error::{EngineError, EngineResult};
use crate::traits::{
    CatalogSource, ContentValidator, DatasetTransfer, FindingStore, QueryExecutor,
    ValidationOutcome,
};

/// Advisory observability events emitted by the upload pipeline.
///
/// Delivery is best-effort; the record state machine is the source of
/// truth.
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    UploadProgress { record_id: RecordId, fraction: f32 },
    RecordSettled { record_id: RecordId, status: DatasetStatus },
}

/// Options controlling run execution
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Independent timeout per rule execution; a timed-out rule is treated
    /// like a per-rule query error
    pub per_rule_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            per_rule_timeout: Duration::from_secs(30),
        }
    }
}

/// Workspace for one active audit, with injected collaborators
pub struct AuditWorkspace<T, V, Q, S, C>
where
    T: DatasetTransfer + 'static,
    V: ContentValidator + 'static,
    Q: QueryExecutor,
    S: FindingStore,
    C: CatalogSource,
{
    audit: Audit,

    /// Record state; all transitions serialize through this mutex
    state: Arc<Mutex<WorkspaceState>>,

    /// Injected services (transfer and validator are shared with upload tasks)
    transfer: Arc<T>,
    validator: Arc<V>,
    executor: Q,
    store: S,
    catalog: C,

    events_tx: mpsc::Sender<WorkspaceEvent>,
    events_rx: Option<mpsc::Receiver<WorkspaceEvent>>,
}

impl<T, V, Q, S, C> AuditWorkspace<T, V, Q, S, C>
where
    T: DatasetTransfer + 'static,
    V: ContentValidator + 'static,
    Q: QueryExecutor,
    S: FindingStore,
    C: CatalogSource,
{
    /// Open a workspace for an audit: fetch the required dataset kinds and
    /// create one Waiting record per kind
    pub async fn open(
        audit: Audit,
        transfer: T,
        validator: V,
        executor: Q,
        store: S,
        catalog: C,
    ) -> EngineResult<Self> {
        let kinds = catalog.dataset_kinds(&audit.id).await?;
        audit_info!(
            audit.id,
            "📂 Opened workspace '{}' with {} required datasets",
            audit.title,
            kinds.len()
        );
        let state = Arc::new(Mutex::new(WorkspaceState::open(kinds)));
        let (events_tx, events_rx) = mpsc::channel(256);
        Ok(Self {
            audit,
            state,
            transfer: Arc::new(transfer),
            validator: Arc::new(validator),
            executor,
            store,
            catalog,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    pub fn audit(&self) -> &Audit {
        &self.audit
    }

    /// Take the event receiver; callable once
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<WorkspaceEvent>> {
        self.events_rx.take()
    }

    /// Snapshot of all records in stable order
    pub async fn records(&self) -> Vec<DatasetRecord> {
        let state = self.state.lock().await;
        state.records().into_iter().cloned().collect()
    }

    pub async fn record_id_for_kind(&self, kind_name: &str) -> Option<RecordId> {
        self.state.lock().await.record_id_for_kind(kind_name)
    }

    pub async fn validation_progress(&self) -> ValidationProgress {
        self.state.lock().await.validation_progress()
    }

    /// True while any upload or validation is still in flight
    pub async fn has_inflight(&self) -> bool {
        self.state.lock().await.has_inflight()
    }

    /// Fresh derived set of validated kind names
    pub async fn validated_kind_names(&self) -> HashSet<String> {
        self.state.lock().await.validated_kind_names()
    }

    /// Begin the asynchronous upload pipeline for one record.
    ///
    /// Legal only from Waiting; a record already uploading (or further
    /// along) rejects with `UploadRejected` and keeps its state. The
    /// transition happens under the state lock before the task is spawned,
    /// so a concurrent double submission loses the race cleanly. The call
    /// returns as soon as the transfer task is started.
    pub async fn begin_upload(&self, record_id: RecordId, source: PathBuf) -> EngineResult<()> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());

        let record = {
            let mut state = self.state.lock().await;
            state.begin_upload(record_id, &file_name)?
        };
        audit_debug!(
            self.audit.id,
            "⬆️ Upload started for '{}' from {}",
            record.kind.name,
            source.display()
        );
        self.spawn_upload_task(record, source);
        Ok(())
    }

    /// Begin upload for every Waiting record that has a staged source,
    /// keyed by kind name. Records that race into another state are
    /// skipped, matching the per-record rejection contract.
    ///
    /// # Returns
    /// The record ids whose upload actually started
    pub async fn upload_all(
        &self,
        sources: &HashMap<String, PathBuf>,
    ) -> EngineResult<Vec<RecordId>> {
        let waiting: Vec<(RecordId, String)> = {
            let state = self.state.lock().await;
            state
                .records()
                .into_iter()
                .filter(|r| r.status == DatasetStatus::Waiting)
                .map(|r| (r.id, r.kind.name.clone()))
                .collect()
        };

        let mut started = Vec::new();
        for (record_id, kind_name) in waiting {
            let Some(source) = sources.get(&kind_name) else {
                continue;
            };
            match self.begin_upload(record_id, source.clone()).await {
                Ok(()) => started.push(record_id),
                Err(EngineError::UploadRejected { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(started)
    }

    /// Retry a failed record: Error → Waiting with error and file cleared
    pub async fn retry(&self, record_id: RecordId) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        state.retry(record_id)?;
        audit_info!(self.audit.id, "🔄 Record {} reset for a fresh attempt", record_id);
        Ok(())
    }

    /// Partition the full rule catalog by current runnability
    pub async fn resolve_runnability(&self) -> EngineResult<Partition> {
        let validated = self.validated_kind_names().await;
        let rules = self.catalog.list_rules().await?;
        Ok(runnability::resolve(&rules, &validated))
    }

    /// Toggle every currently-runnable rule of a category in the caller's
    /// selection set; non-runnable members are untouched
    pub async fn toggle_category(
        &self,
        selected: &mut HashSet<String>,
        category: &str,
    ) -> EngineResult<()> {
        let partition = self.resolve_runnability().await?;
        let runnable_ids: Vec<String> = partition
            .runnable
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.id.clone())
            .collect();
        runnability::toggle_category(selected, &runnable_ids);
        Ok(())
    }

    /// Execute the selected rules with default options and no cancellation
    pub async fn run_rules(&self, selected_rule_ids: &HashSet<String>) -> EngineResult<RunResult> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_rules_with_options(selected_rule_ids, RunOptions::default(), cancel_rx)
            .await
    }

    /// Execute the selected rules.
    ///
    /// Implements the run contract: empty selections are rejected before
    /// any I/O; the validated-kind set is recomputed fresh; unknown rule
    /// ids are dropped by the catalog; non-runnable rules are skipped, not
    /// executed; a rule that fails or times out individually is logged and
    /// excluded without failing the run; findings persist as one batch, and
    /// a persistence or transport failure fails the whole run with no
    /// partial result. Cancellation observed before the persistence step
    /// discards all per-rule results atomically.
    pub async fn run_rules_with_options(
        &self,
        selected_rule_ids: &HashSet<String>,
        options: RunOptions,
        cancel: watch::Receiver<bool>,
    ) -> EngineResult<RunResult> {
        if selected_rule_ids.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let run_id = RunId::new();
        audit_info!(
            self.audit.id,
            "▶️ Run {} over {} selected rules",
            run_id,
            selected_rule_ids.len()
        );

        // Recomputed, never cached: validation may settle concurrently
        let validated = self.validated_kind_names().await;

        let ids: Vec<String> = selected_rule_ids.iter().cloned().collect();
        let rules = self.catalog.rules_by_ids(&ids).await?;
        if rules.len() < ids.len() {
            audit_debug!(
                self.audit.id,
                "🗑️ {} selected rule ids no longer exist in the catalog",
                ids.len() - rules.len()
            );
        }

        let partition = runnability::resolve(&rules, &validated);
        for rule in &partition.not_runnable {
            audit_info!(
                self.audit.id,
                "⏭️ Rule {} skipped: requires '{}'",
                rule.id,
                rule.required_data
            );
        }

        let outcomes = tokio::select! {
            outcomes = self.execute_rules(&partition.runnable, &options) => outcomes?,
            _ = Self::cancelled(cancel.clone()) => {
                audit_info!(self.audit.id, "🛑 Run {} cancelled during execution", run_id);
                return Err(EngineError::RunCancelled);
            }
        };

        let aggregated = run::aggregate(outcomes);
        for (rule_id, message) in &aggregated.failed_rules {
            audit_error!(
                self.audit.id,
                "❌ Rule {} failed during run {}: {}",
                rule_id,
                run_id,
                message
            );
        }

        if *cancel.borrow() {
            audit_info!(self.audit.id, "🛑 Run {} cancelled before persistence", run_id);
            return Err(EngineError::RunCancelled);
        }

        self.store
            .insert_findings(&self.audit.id, run_id, &aggregated.findings)
            .await
            .map_err(|e| EngineError::run_execution(format!("finding persistence failed: {e}")))?;

        audit_info!(
            self.audit.id,
            "✅ Run {} complete: {} findings, {} rules executed, {} skipped",
            run_id,
            aggregated.findings.len(),
            aggregated.executed_count,
            partition.not_runnable.len()
        );

        Ok(RunResult {
            found_findings: aggregated.findings,
            skipped_rules: partition.not_runnable,
            run_rule_count: aggregated.executed_count,
        })
    }

    /// Run every runnable rule with one timeout each, concurrently, and
    /// collect the per-rule outcomes. Only a transport-level executor
    /// failure (`RunExecution`) aborts; everything else is absorbed into
    /// the rule's own outcome.
    async fn execute_rules(
        &self,
        runnable: &[Rule],
        options: &RunOptions,
    ) -> EngineResult<Vec<RuleExecution>> {
        let executions = runnable.iter().map(|rule| {
            let rule = rule.clone();
            async move {
                let result = timeout(
                    options.per_rule_timeout,
                    self.executor.execute(&rule.logic, &self.audit.id),
                )
                .await;
                match result {
                    Ok(Ok(rows)) => Ok(RuleExecution::Completed { rule, rows }),
                    Ok(Err(transport @ EngineError::RunExecution { .. })) => Err(transport),
                    Ok(Err(e)) => Ok(RuleExecution::Failed {
                        rule,
                        message: e.to_string(),
                    }),
                    Err(_) => Ok(RuleExecution::Failed {
                        rule,
                        message: format!(
                            "execution timed out after {:?}",
                            options.per_rule_timeout
                        ),
                    }),
                }
            }
        });
        join_all(executions).await.into_iter().collect()
    }

    /// Resolves when the cancel flag flips to true; pends forever if the
    /// sender is gone (an unused cancellation handle never cancels)
    async fn cancelled(mut cancel: watch::Receiver<bool>) {
        loop {
            if *cancel.borrow() {
                return;
            }
            if cancel.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    fn spawn_upload_task(&self, record: DatasetRecord, source: PathBuf) {
        let state = Arc::clone(&self.state);
        let transfer = Arc::clone(&self.transfer);
        let validator = Arc::clone(&self.validator);
        let events = self.events_tx.clone();
        let audit_id = self.audit.id.clone();
        let record_id = record.id;

        tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::channel::<f32>(16);

            // Forward advisory progress into record state and events
            let progress_state = Arc::clone(&state);
            let progress_events = events.clone();
            let progress_task = tokio::spawn(async move {
                while let Some(fraction) = progress_rx.recv().await {
                    {
                        let mut st = progress_state.lock().await;
                        let _ = st.upload_progress(record_id, fraction);
                    }
                    let _ = progress_events
                        .try_send(WorkspaceEvent::UploadProgress { record_id, fraction });
                }
            });

            let staged = transfer.transfer(&record, &source, progress_tx).await;
            let _ = progress_task.await;

            let settled_status = match staged {
                Ok(staged_path) => {
                    {
                        let mut st = state.lock().await;
                        if let Err(e) = st.complete_upload(record_id) {
                            audit_error!(audit_id, "❌ Stale upload task for {}: {}", record_id, e);
                            return;
                        }
                    }
                    audit_debug!(audit_id, "📦 Record {} uploaded, validating", record_id);

                    // Validation follows immediately; a validator transport
                    // failure lands the record in Error like any rejection
                    let outcome = match validator.validate(&record, &staged_path).await {
                        Ok(outcome) => outcome,
                        Err(e) => ValidationOutcome::reject(format!(
                            "Doğrulama servisine ulaşılamadı: {e}"
                        )),
                    };

                    let mut st = state.lock().await;
                    match st.apply_validation(record_id, outcome) {
                        Ok(status) => status,
                        Err(e) => {
                            audit_error!(
                                audit_id,
                                "❌ Validation transition failed for {}: {}",
                                record_id,
                                e
                            );
                            return;
                        }
                    }
                }
                Err(e) => {
                    audit_error!(audit_id, "❌ Upload failed for record {}: {}", record_id, e);
                    let mut st = state.lock().await;
                    match st.fail_upload(record_id, format!("Dosya aktarımı başarısız: {e}")) {
                        Ok(()) => DatasetStatus::Error,
                        Err(transition) => {
                            audit_error!(
                                audit_id,
                                "❌ Stale upload task for {}: {}",
                                record_id,
                                transition
                            );
                            return;
                        }
                    }
                }
            };

            match settled_status {
                DatasetStatus::Validated => {
                    audit_info!(audit_id, "✅ Record {} validated", record_id)
                }
                status => audit_info!(audit_id, "⚠️ Record {} settled as {}", record_id, status),
            }
            let _ = events.try_send(WorkspaceEvent::RecordSettled {
                record_id,
                status: settled_status,
            });
        });
    }
}
