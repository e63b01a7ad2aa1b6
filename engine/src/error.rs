//! Engine-specific error types

use shared::{DatasetStatus, RecordId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Upload rejected for record {record_id}: current status is {status}")]
    UploadRejected {
        record_id: RecordId,
        status: DatasetStatus,
    },

    #[error("{operation} rejected for record {record_id}: current status is {status}")]
    TransitionRejected {
        record_id: RecordId,
        status: DatasetStatus,
        operation: &'static str,
    },

    #[error("Unknown dataset record: {record_id}")]
    RecordNotFound { record_id: RecordId },

    #[error("No rules selected for the run")]
    EmptySelection,

    #[error("Run execution failed: {message}")]
    RunExecution { message: String },

    #[error("Rule query failed: {message}")]
    QueryFailed { message: String },

    #[error("Run cancelled before persistence")]
    RunCancelled,

    #[error("Catalog read failed: {message}")]
    Catalog { message: String },

    #[error("Storage operation failed: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Analyst request failed: {message}")]
    Analyst { message: String },

    #[error("Shared component error")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl EngineError {
    pub fn run_execution<M: Into<String>>(message: M) -> Self {
        EngineError::RunExecution {
            message: message.into(),
        }
    }

    pub fn query_failed<M: Into<String>>(message: M) -> Self {
        EngineError::QueryFailed {
            message: message.into(),
        }
    }

    pub fn catalog<M: Into<String>>(message: M) -> Self {
        EngineError::Catalog {
            message: message.into(),
        }
    }

    pub fn storage<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        EngineError::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn analyst<M: Into<String>>(message: M) -> Self {
        EngineError::Analyst {
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
