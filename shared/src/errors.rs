//! Shared error types for the audit engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid severity value: {input}")]
    InvalidSeverity { input: String },

    #[error("Invalid domain value: {input}")]
    InvalidDomain { input: String },

    #[error("Invalid dataset status: {input}")]
    InvalidStatus { input: String },

    #[error("Invalid identifier: {input}")]
    InvalidId { input: String },

    #[error("Malformed catalog entry: {message}")]
    CatalogFormat { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
