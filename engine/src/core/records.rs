//! Dataset validation state machine
//!
//! Tracks the upload/validation lifecycle of every required dataset kind
//! for one open audit:
//!
//! `Waiting → Uploading → Uploaded → {Validated | Error}`, with
//! `Error → Waiting` via retry. Validated is the success terminal; Error
//! is terminal per attempt but recoverable.
//!
//! The only state this component exposes to the runnability resolver is
//! the derived validated-kind-name set, recomputed on every call.

use std::collections::{HashMap, HashSet};

use shared::{normalize_kind_name, DatasetKind, DatasetRecord, DatasetStatus, RecordId};

use crate::error::{EngineError, EngineResult};
use crate::traits::ValidationOutcome;

/// Derived upload/validation progress across all records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationProgress {
    pub percentage: u8,
    pub validated_count: usize,
    pub total_count: usize,
}

/// Mutable per-session record set for one open audit
///
/// All transitions for a record go through this struct; callers serialize
/// access (the workspace holds it behind a mutex), so a record is never
/// mutated by two transitions concurrently.
pub struct WorkspaceState {
    records: HashMap<RecordId, DatasetRecord>,
    /// Stable presentation/iteration order (catalog order at open)
    order: Vec<RecordId>,
}

impl WorkspaceState {
    /// Open a workspace: one Waiting record per required kind
    pub fn open(kinds: Vec<DatasetKind>) -> Self {
        let mut records = HashMap::new();
        let mut order = Vec::new();
        for kind in kinds {
            let record = DatasetRecord::waiting(kind);
            order.push(record.id);
            records.insert(record.id, record);
        }
        Self { records, order }
    }

    pub fn record(&self, record_id: RecordId) -> Option<&DatasetRecord> {
        self.records.get(&record_id)
    }

    /// All records in stable order
    pub fn records(&self) -> Vec<&DatasetRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Find the record tracking a kind, matched by exact catalog name
    pub fn record_id_for_kind(&self, kind_name: &str) -> Option<RecordId> {
        self.order
            .iter()
            .find(|id| {
                self.records
                    .get(id)
                    .is_some_and(|r| r.kind.name == kind_name)
            })
            .copied()
    }

    fn record_mut(&mut self, record_id: RecordId) -> EngineResult<&mut DatasetRecord> {
        self.records
            .get_mut(&record_id)
            .ok_or(EngineError::RecordNotFound { record_id })
    }

    /// Begin an upload attempt. Legal only from Waiting; rejected otherwise
    /// so a double submission cannot corrupt an in-flight transfer.
    ///
    /// # Returns
    /// A snapshot of the record after the transition
    pub fn begin_upload(
        &mut self,
        record_id: RecordId,
        file_name: &str,
    ) -> EngineResult<DatasetRecord> {
        let record = self.record_mut(record_id)?;
        if record.status != DatasetStatus::Waiting {
            return Err(EngineError::UploadRejected {
                record_id,
                status: record.status,
            });
        }
        record.status = DatasetStatus::Uploading;
        record.source_file_name = Some(file_name.to_string());
        record.error_message = None;
        record.upload_progress = 0.0;
        Ok(record.clone())
    }

    /// Advisory transfer progress; never changes state
    pub fn upload_progress(&mut self, record_id: RecordId, fraction: f32) -> EngineResult<()> {
        let record = self.record_mut(record_id)?;
        record.upload_progress = fraction.clamp(0.0, 1.0);
        Ok(())
    }

    /// Transfer finished: Uploading → Uploaded
    pub fn complete_upload(&mut self, record_id: RecordId) -> EngineResult<()> {
        let record = self.record_mut(record_id)?;
        if record.status != DatasetStatus::Uploading {
            return Err(EngineError::TransitionRejected {
                record_id,
                status: record.status,
                operation: "complete_upload",
            });
        }
        record.status = DatasetStatus::Uploaded;
        record.upload_progress = 1.0;
        Ok(())
    }

    /// Transfer failed mid-flight: Uploading → Error, recoverable via retry
    pub fn fail_upload(&mut self, record_id: RecordId, message: String) -> EngineResult<()> {
        let record = self.record_mut(record_id)?;
        if record.status != DatasetStatus::Uploading {
            return Err(EngineError::TransitionRejected {
                record_id,
                status: record.status,
                operation: "fail_upload",
            });
        }
        record.status = DatasetStatus::Error;
        record.error_message = Some(message);
        Ok(())
    }

    /// Apply the external validator's verdict: Uploaded → Validated, or
    /// Uploaded → Error with the message attached.
    ///
    /// # Returns
    /// The record's resulting status
    pub fn apply_validation(
        &mut self,
        record_id: RecordId,
        outcome: ValidationOutcome,
    ) -> EngineResult<DatasetStatus> {
        let record = self.record_mut(record_id)?;
        if record.status != DatasetStatus::Uploaded {
            return Err(EngineError::TransitionRejected {
                record_id,
                status: record.status,
                operation: "apply_validation",
            });
        }
        if outcome.valid {
            record.status = DatasetStatus::Validated;
            record.error_message = None;
        } else {
            record.status = DatasetStatus::Error;
            record.error_message = outcome
                .error_message
                .or_else(|| Some("Bilinmeyen bir veri formatı hatası oluştu.".to_string()));
        }
        Ok(record.status)
    }

    /// Retry after a failed attempt: Error → Waiting, discarding the prior
    /// error message and source file name. Rejected from any other state.
    pub fn retry(&mut self, record_id: RecordId) -> EngineResult<()> {
        let record = self.record_mut(record_id)?;
        if record.status != DatasetStatus::Error {
            return Err(EngineError::TransitionRejected {
                record_id,
                status: record.status,
                operation: "retry",
            });
        }
        record.status = DatasetStatus::Waiting;
        record.error_message = None;
        record.source_file_name = None;
        record.upload_progress = 0.0;
        Ok(())
    }

    /// Normalized names of all validated kinds.
    ///
    /// Recomputed from the current record set on every call: upload and
    /// validation are asynchronous, so this set can change at any moment
    /// relative to a runnability check. Never cache it.
    pub fn validated_kind_names(&self) -> HashSet<String> {
        self.records
            .values()
            .filter(|r| r.status == DatasetStatus::Validated)
            .map(|r| normalize_kind_name(&r.kind.name))
            .collect()
    }

    /// Overall progress: a Validated record contributes 100, an Uploaded
    /// record 50, anything else 0.
    pub fn validation_progress(&self) -> ValidationProgress {
        let total_count = self.records.len();
        if total_count == 0 {
            return ValidationProgress {
                percentage: 0,
                validated_count: 0,
                total_count: 0,
            };
        }
        let mut progress_sum = 0u32;
        let mut validated_count = 0usize;
        for record in self.records.values() {
            match record.status {
                DatasetStatus::Validated => {
                    progress_sum += 100;
                    validated_count += 1;
                }
                DatasetStatus::Uploaded => progress_sum += 50,
                _ => {}
            }
        }
        ValidationProgress {
            percentage: (progress_sum as f64 / total_count as f64).round() as u8,
            validated_count,
            total_count,
        }
    }

    /// True while any record has an unfinished upload or validation
    pub fn has_inflight(&self) -> bool {
        self.records.values().any(|r| {
            matches!(
                r.status,
                DatasetStatus::Uploading | DatasetStatus::Uploaded
            )
        })
    }
}
