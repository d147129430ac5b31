//! Error types shared by request store implementations.
//!
//! The store collaborator is responsible for single-writer-per-request
//! semantics: a write that states a stale expected version must fail with
//! [`StoreError::Conflict`] instead of silently overwriting (last-write-wins
//! is not acceptable). Callers decide whether to re-read and retry.

use crate::identity::{RequestId, Version};
use futures::future::BoxFuture;
use thiserror::Error;

/// Boxed future returned by dyn-compatible store traits.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: expected version doesn't match current version.
    ///
    /// Another writer has modified the request since it was read.
    #[error("Concurrency conflict on {id}: expected version {expected}, found {actual}")]
    Conflict {
        /// The request where the conflict occurred.
        id: RequestId,
        /// The version the writer read.
        expected: Version,
        /// The version currently stored.
        actual: Version,
    },

    /// Request not found in the store.
    #[error("Request not found: {0}")]
    NotFound(RequestId),

    /// A request with the same ID already exists.
    #[error("Request already exists: {0}")]
    AlreadyExists(RequestId),

    /// Backend failure (connection, query, serialization).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true when re-reading the current state and trying again may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_display() {
        let error = StoreError::Conflict {
            id: RequestId::new("da-1"),
            expected: Version::new(5),
            actual: Version::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
        assert!(error.is_conflict());
    }

    #[test]
    fn not_found_error_display() {
        let error = StoreError::NotFound(RequestId::new("missing-da"));
        assert!(format!("{error}").contains("missing-da"));
        assert!(!error.is_conflict());
    }
}
