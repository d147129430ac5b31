//! Request store collaborator.
//!
//! The store owns persistence and guarantees single-writer-per-request
//! semantics: every write states the version it was evaluated against and a
//! stale write fails with [`StoreError::Conflict`]. The lifecycle core never
//! retries on its own.

use crate::types::{ProcurementRequest, RequestStatus, StageKind, StageRecord};
use kimbo_core::identity::{RequestId, Version};
use kimbo_core::store::{StoreError, StoreFuture};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Instrument;

/// A request together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedRequest {
    /// Stored request
    pub request: ProcurementRequest,
    /// Version to state when writing back
    pub version: Version,
}

/// The write produced by a successful transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageWrite {
    /// New status
    pub status: RequestStatus,
    /// Slot to write
    pub stage: StageKind,
    /// Record stored in the slot
    pub record: StageRecord,
}

/// Persistence for procurement requests.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the store can be shared as
/// `Arc<dyn RequestStore>` and captured by reducer effects.
pub trait RequestStore: Send + Sync {
    /// Store a new request at version 1.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if the id is taken.
    fn create_request(&self, request: ProcurementRequest) -> StoreFuture<'_, Version>;

    /// Read a request and its current version.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no request has this id.
    fn read_request(&self, id: &RequestId) -> StoreFuture<'_, VersionedRequest>;

    /// Write status and stage record together if the stored version is `expected`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conflict`] if the stored version differs from `expected`
    /// - [`StoreError::NotFound`] if no request has this id
    fn write_transition(
        &self,
        id: &RequestId,
        expected: Version,
        write: StageWrite,
    ) -> StoreFuture<'_, Version>;
}

#[derive(Debug)]
struct Entry {
    request: ProcurementRequest,
    version: Version,
}

/// `HashMap`-backed store for tests and the demo binary.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRequestStore {
    requests: Arc<RwLock<HashMap<RequestId, Entry>>>,
}

impl InMemoryRequestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }
}

impl RequestStore for InMemoryRequestStore {
    fn create_request(&self, request: ProcurementRequest) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let mut requests = self.requests.write().await;
            let id = request.id().clone();
            if requests.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }

            let version = Version::INITIAL.next();
            tracing::debug!(request_id = %id, %version, "Request stored");
            requests.insert(id, Entry { request, version });
            Ok(version)
        })
    }

    fn read_request(&self, id: &RequestId) -> StoreFuture<'_, VersionedRequest> {
        let id = id.clone();
        Box::pin(async move {
            let requests = self.requests.read().await;
            requests
                .get(&id)
                .map(|entry| VersionedRequest {
                    request: entry.request.clone(),
                    version: entry.version,
                })
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn write_transition(
        &self,
        id: &RequestId,
        expected: Version,
        write: StageWrite,
    ) -> StoreFuture<'_, Version> {
        let span = tracing::debug_span!(
            "write_transition",
            request_id = %id,
            %expected,
            status = %write.status
        );
        let id = id.clone();
        Box::pin(
            async move {
                let mut requests = self.requests.write().await;
                let entry = requests
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;

                if entry.version != expected {
                    tracing::debug!(actual = %entry.version, "Stale write refused");
                    return Err(StoreError::Conflict {
                        id,
                        expected,
                        actual: entry.version,
                    });
                }

                entry.request.write_stage(write.status, write.stage, write.record);
                entry.version = entry.version.next();
                Ok(entry.version)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use kimbo_testing::test_epoch;

    fn draft(id: &str) -> ProcurementRequest {
        ProcurementRequest::create(RequestId::new(id), "DA-2025-0001", None, test_epoch())
    }

    fn submission() -> StageWrite {
        StageWrite {
            status: RequestStatus::Submitted,
            stage: StageKind::Submission,
            record: StageRecord::new(test_epoch()),
        }
    }

    #[tokio::test]
    async fn create_then_read_at_version_one() {
        let store = InMemoryRequestStore::new();
        let version = store.create_request(draft("da-1")).await.unwrap();
        assert_eq!(version, Version::new(1));

        let read = store.read_request(&RequestId::new("da-1")).await.unwrap();
        assert_eq!(read.version, Version::new(1));
        assert_eq!(read.request.status(), RequestStatus::Draft);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_create_is_refused() {
        let store = InMemoryRequestStore::new();
        store.create_request(draft("da-1")).await.unwrap();
        assert_eq!(
            store.create_request(draft("da-1")).await,
            Err(StoreError::AlreadyExists(RequestId::new("da-1")))
        );
    }

    #[tokio::test]
    async fn write_bumps_version_and_stores_status_with_record() {
        let store = InMemoryRequestStore::new();
        store.create_request(draft("da-1")).await.unwrap();

        let id = RequestId::new("da-1");
        let version = store.write_transition(&id, Version::new(1), submission()).await.unwrap();
        assert_eq!(version, Version::new(2));

        let read = store.read_request(&id).await.unwrap();
        assert_eq!(read.request.status(), RequestStatus::Submitted);
        assert!(read.request.stage(StageKind::Submission).is_some());
    }

    #[tokio::test]
    async fn stale_write_conflicts_and_leaves_request_unchanged() {
        let store = InMemoryRequestStore::new();
        store.create_request(draft("da-1")).await.unwrap();
        let id = RequestId::new("da-1");
        store.write_transition(&id, Version::new(1), submission()).await.unwrap();
        let before = store.read_request(&id).await.unwrap();

        let stale = store.write_transition(&id, Version::new(1), submission()).await;
        assert_eq!(
            stale,
            Err(StoreError::Conflict {
                id: id.clone(),
                expected: Version::new(1),
                actual: Version::new(2),
            })
        );
        assert_eq!(store.read_request(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let store = InMemoryRequestStore::new();
        let id = RequestId::new("ghost");
        assert_eq!(store.read_request(&id).await, Err(StoreError::NotFound(id.clone())));
        assert!(store.is_empty().await);
    }
}
