//! Errors of the procurement lifecycle.

use crate::types::RequestStatus;
use kimbo_core::identity::{RequestId, Version};
use kimbo_core::store::StoreError;
use thiserror::Error;

/// A caller-correctable guard failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardFailure {
    /// The justification is shorter than required once trimmed.
    #[error("justification must be at least {min} characters long (got {actual})")]
    ReasonTooShort {
        /// Required number of characters
        min: usize,
        /// Characters provided after trimming
        actual: usize,
    },

    /// A required field is missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },
}

/// Errors surfaced by the lifecycle engine and the service layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A guard was not met. Never retried automatically.
    #[error("Validation failed: {0}")]
    Validation(#[from] GuardFailure),

    /// The target status is not reachable from the current one.
    #[error("Cannot move a request from {from} to {to}")]
    IllegalTransition {
        /// Current status
        from: RequestStatus,
        /// Requested status
        to: RequestStatus,
    },

    /// The stored request changed since it was read. Retryable.
    #[error("Request {id} was modified concurrently: expected version {expected}, found {actual}")]
    Conflict {
        /// Request written
        id: RequestId,
        /// Version the writer read
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// No request with this id.
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    /// The request store failed.
    #[error("Request store failed: {0}")]
    Store(String),

    /// The runtime failed to deliver an outcome.
    #[error("Runtime failed: {0}")]
    Runtime(String),
}

impl LifecycleError {
    /// True only for concurrency conflicts: re-reading and re-evaluating may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Short machine-readable kind, used as a metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(GuardFailure::ReasonTooShort { .. }) => "reason_too_short",
            Self::Validation(GuardFailure::MissingField { .. }) => "missing_field",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::Conflict { .. } => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
            Self::Runtime(_) => "runtime",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => Self::Conflict {
                id,
                expected,
                actual,
            },
            StoreError::NotFound(id) => Self::NotFound(id),
            other @ (StoreError::AlreadyExists(_) | StoreError::Backend(_)) => {
                Self::Store(other.to_string())
            },
        }
    }
}
