//! Logging utilities for structured tracing

use crate::error::AggregatorError;
use std::time::Instant;

/// Track operation timing and log on drop
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        tracing::debug!(
            operation = %self.operation,
            duration_ms = duration_ms,
            "Operation completed"
        );
    }
}

/// Log a failure with its kind and, when present, the remote call that caused it
pub fn log_error(operation: &str, error: &AggregatorError) {
    match error.context() {
        Some(context) => tracing::error!(
            operation = %operation,
            error = %error,
            error_kind = ?error.kind(),
            remote_operation = %context.operation,
            target = %context.target,
            "Operation failed"
        ),
        None => tracing::error!(
            operation = %operation,
            error = %error,
            error_kind = ?error.kind(),
            "Operation failed"
        ),
    }
}
