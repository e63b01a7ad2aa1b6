//! Shared logging utilities for consistent tracing across the engine

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Initialize tracing subscriber with the default filter for the engine
pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Initialize tracing subscriber with an explicit base level
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let filter = format!("engine={base_level},shared={base_level},reqwest=warn,hyper=warn");

    fmt()
        .with_env_filter(EnvFilter::new(&filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for audit-scoped info logging
#[macro_export]
macro_rules! audit_info {
    ($audit_id:expr, $($arg:tt)*) => {
        tracing::info!(
            audit = %$audit_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for audit-scoped warning logging
#[macro_export]
macro_rules! audit_warn {
    ($audit_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            audit = %$audit_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for audit-scoped error logging
#[macro_export]
macro_rules! audit_error {
    ($audit_id:expr, $($arg:tt)*) => {
        tracing::error!(
            audit = %$audit_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for audit-scoped debug logging
#[macro_export]
macro_rules! audit_debug {
    ($audit_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            audit = %$audit_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(audit_id: &str, details: &str) {
    info!(
        audit = %audit_id,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(audit_id: &str, reason: &str) {
    info!(
        audit = %audit_id,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(audit_id: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        audit = %audit_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(audit_id: &str, message: &str) {
    info!(
        audit = %audit_id,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
