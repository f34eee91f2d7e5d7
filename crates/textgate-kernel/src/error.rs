//! Crate-wide error taxonomy.
//!
//! Every failure is classified at its origin into one of these categories
//! and passed up unmodified; the orchestrator is the only translation
//! point to externally visible shapes, and no component below it invents
//! new categories.

use crate::operation::Operation;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Platform-level error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    /// Bad input shape or size. Client error, never retried.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Admission denied by the daily quota. Carries the counts observed
    /// at the denial instant.
    #[error("daily limit exceeded for '{operation}': {used}/{limit} requests used today")]
    QuotaExceeded {
        operation: Operation,
        used: u64,
        limit: u64,
    },

    /// The model for an operation could not be loaded. Operator-actionable;
    /// not silently retried.
    #[error("model unavailable for '{operation}': {reason}")]
    ModelUnavailable { operation: Operation, reason: String },

    /// Inference execution failed after admission. The reservation is
    /// rolled back, so a caller retry is not penalized twice.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceFailure),

    /// Startup-time misconfiguration. Fatal for the affected operation,
    /// or for the whole process in eager-load mode.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The usage store itself failed.
    #[error("usage store failure: {0}")]
    Store(#[from] StoreError),
}

impl PlatformError {
    /// True for failures caused by the caller (bad input, quota), as
    /// opposed to service-side faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlatformError::Validation(_) | PlatformError::QuotaExceeded { .. }
        )
    }
}

/// Failure reported by the inference boundary.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InferenceFailure {
    /// The call exceeded the caller-specified deadline.
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    /// The backend reported a runtime fault.
    #[error("inference runtime fault: {0}")]
    Runtime(String),
}

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, PlatformError>;
