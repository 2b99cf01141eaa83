//! In-memory [`RemoteLogStore`].
//!
//! Holds blobs in a mutex-guarded map, enforces revision checks atomically,
//! and records how often each operation ran. Failures and concurrent writers
//! can be scripted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use genlog_core::{BlobContent, BlobRef, BlobStoreError, RemoteLogStore, Revision};
use tracing::{debug, trace};

// ============================================================================
// Types
// ============================================================================

/// Operation that a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `list`
    List,
    /// `create`
    Create,
    /// `read_content`
    Read,
    /// `update_content`
    Update,
}

/// How many times each operation was invoked (including failed calls).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `list` calls.
    pub lists: usize,
    /// `create` calls.
    pub creates: usize,
    /// `read_content` calls.
    pub reads: usize,
    /// `update_content` calls.
    pub updates: usize,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    id: String,
    name: String,
    container: String,
    mime_type: String,
    bytes: Vec<u8>,
    version: u64,
}

impl StoredBlob {
    fn revision(&self) -> Revision {
        Revision::new(self.version.to_string())
    }

    fn to_ref(&self) -> BlobRef {
        BlobRef::new(&self.id, &self.name).with_revision(self.revision())
    }
}

#[derive(Debug, Clone)]
struct PendingWrite {
    container: String,
    name: String,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: Vec<StoredBlob>,
    next_id: u64,
    calls: CallCounts,
    failures: VecDeque<FailurePoint>,
    after_read: Option<PendingWrite>,
    after_create: Option<PendingWrite>,
    after_create_failure: Option<FailurePoint>,
}

impl Inner {
    fn take_failure(&mut self, point: FailurePoint) -> Option<BlobStoreError> {
        let pos = self.failures.iter().position(|f| *f == point)?;
        self.failures.remove(pos);
        Some(BlobStoreError::Unavailable(format!("injected {point:?} failure")))
    }

    fn insert(&mut self, container: &str, name: &str, mime_type: &str, bytes: Vec<u8>) -> &StoredBlob {
        self.next_id += 1;
        let blob = StoredBlob {
            id: format!("mem-{}", self.next_id),
            name: name.to_string(),
            container: container.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
            version: 1,
        };
        self.blobs.push(blob);
        &self.blobs[self.blobs.len() - 1]
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut StoredBlob> {
        self.blobs.iter_mut().find(|b| b.id == id)
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// A [`RemoteLogStore`] that lives in process memory.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every read by `latency`, after the snapshot is taken.
    ///
    /// Widens the window between read and write so concurrent appends
    /// actually interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a blob directly, bypassing call counting. Returns its id.
    pub fn seed(&self, container: &str, name: &str, bytes: &[u8]) -> String {
        let mut inner = self.lock();
        inner
            .insert(container, name, genlog_core::TABLE_MIME_TYPE, bytes.to_vec())
            .id
            .clone()
    }

    /// Makes the next call of the given operation fail with `Unavailable`.
    pub fn fail_next(&self, point: FailurePoint) {
        self.lock().failures.push_back(point);
    }

    /// Queues a failure of `point` once the next create has succeeded.
    pub fn fail_after_next_create(&self, point: FailurePoint) {
        self.lock().after_create_failure = Some(point);
    }

    /// Simulates another writer replacing a blob right after the next read.
    pub fn concurrent_write_after_next_read(&self, container: &str, name: &str, content: &[u8]) {
        self.lock().after_read = Some(PendingWrite {
            container: container.to_string(),
            name: name.to_string(),
            content: content.to_vec(),
        });
    }

    /// Simulates another writer creating a blob right after the next create.
    pub fn concurrent_create_after_next_create(&self, container: &str, name: &str, content: &[u8]) {
        self.lock().after_create = Some(PendingWrite {
            container: container.to_string(),
            name: name.to_string(),
            content: content.to_vec(),
        });
    }

    /// Operation counts so far.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Contents of every blob named `name` in `container`, in creation order.
    pub fn contents_of(&self, container: &str, name: &str) -> Vec<Vec<u8>> {
        self.lock()
            .blobs
            .iter()
            .filter(|b| b.container == container && b.name == name)
            .map(|b| b.bytes.clone())
            .collect()
    }

    /// Text of the first blob named `name` in `container`.
    pub fn text_of(&self, container: &str, name: &str) -> Option<String> {
        self.contents_of(container, name)
            .into_iter()
            .next()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// MIME type of the first blob named `name` in `container`.
    pub fn mime_type_of(&self, container: &str, name: &str) -> Option<String> {
        self.lock()
            .blobs
            .iter()
            .find(|b| b.container == container && b.name == name)
            .map(|b| b.mime_type.clone())
    }

    /// Number of blobs held.
    pub fn len(&self) -> usize {
        self.lock().blobs.len()
    }

    /// True if no blob is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RemoteLogStore for MemoryLogStore {
    async fn list(&self, name: &str, container_id: &str) -> Result<Vec<BlobRef>, BlobStoreError> {
        let mut inner = self.lock();
        inner.calls.lists += 1;
        if let Some(err) = inner.take_failure(FailurePoint::List) {
            return Err(err);
        }
        let found: Vec<BlobRef> = inner
            .blobs
            .iter()
            .filter(|b| b.container == container_id && b.name == name)
            .map(StoredBlob::to_ref)
            .collect();
        trace!(name, container_id, count = found.len(), "list");
        Ok(found)
    }

    async fn create(
        &self,
        name: &str,
        container_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<BlobRef, BlobStoreError> {
        let mut inner = self.lock();
        inner.calls.creates += 1;
        if let Some(err) = inner.take_failure(FailurePoint::Create) {
            return Err(err);
        }
        let blob = inner.insert(container_id, name, mime_type, content).to_ref();
        debug!(blob_id = %blob.id, name, "create");

        if let Some(other) = inner.after_create.take() {
            inner.insert(&other.container, &other.name, mime_type, other.content);
        }
        if let Some(point) = inner.after_create_failure.take() {
            inner.failures.push_back(point);
        }
        Ok(blob)
    }

    async fn read_content(&self, blob_id: &str) -> Result<BlobContent, BlobStoreError> {
        let content = {
            let mut inner = self.lock();
            inner.calls.reads += 1;
            if let Some(err) = inner.take_failure(FailurePoint::Read) {
                return Err(err);
            }
            let blob = inner
                .blobs
                .iter()
                .find(|b| b.id == blob_id)
                .ok_or_else(|| BlobStoreError::NotFound(blob_id.to_string()))?;
            let content = BlobContent::new(blob.bytes.clone(), Some(blob.revision()));

            if let Some(pending) = inner.after_read.take() {
                for blob in inner
                    .blobs
                    .iter_mut()
                    .filter(|b| b.container == pending.container && b.name == pending.name)
                {
                    blob.bytes.clone_from(&pending.content);
                    blob.version += 1;
                }
            }
            content
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(content)
    }

    async fn update_content(
        &self,
        blob_id: &str,
        content: Vec<u8>,
        expected: Option<&Revision>,
    ) -> Result<BlobRef, BlobStoreError> {
        let mut inner = self.lock();
        inner.calls.updates += 1;
        if let Some(err) = inner.take_failure(FailurePoint::Update) {
            return Err(err);
        }
        let blob = inner
            .find_mut(blob_id)
            .ok_or_else(|| BlobStoreError::NotFound(blob_id.to_string()))?;

        let current = blob.revision();
        if let Some(expected) = expected {
            if *expected != current {
                return Err(BlobStoreError::Conflict {
                    expected: expected.to_string(),
                    actual: current.to_string(),
                });
            }
        }

        blob.bytes = content;
        blob.version += 1;
        debug!(blob_id, version = blob.version, "update");
        Ok(blob.to_ref())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_scoped_to_container() {
        let store = MemoryLogStore::new();
        store.seed("a", "log.csv", b"x");
        store.seed("b", "log.csv", b"y");

        let found = store.list("log.csv", "a").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.calls().lists, 1);
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let store = MemoryLogStore::new();
        let id = store.seed("a", "log.csv", b"x");
        let read = store.read_content(&id).await.unwrap();
        let revision = read.revision.unwrap();

        store
            .update_content(&id, b"xy".to_vec(), Some(&revision))
            .await
            .unwrap();

        let err = store
            .update_content(&id, b"xz".to_vec(), Some(&revision))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobStoreError::Conflict { .. }));
        assert_eq!(store.text_of("a", "log.csv").unwrap(), "xy");
    }

    #[tokio::test]
    async fn test_update_without_revision_overwrites() {
        let store = MemoryLogStore::new();
        let id = store.seed("a", "log.csv", b"x");
        store.update_content(&id, b"new".to_vec(), None).await.unwrap();
        assert_eq!(store.text_of("a", "log.csv").unwrap(), "new");
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryLogStore::new();
        store.fail_next(FailurePoint::List);

        assert!(store.list("log.csv", "a").await.is_err());
        assert!(store.list("log.csv", "a").await.is_ok());
        assert_eq!(store.calls().lists, 2);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let store = MemoryLogStore::new();
        let err = store.read_content("mem-99").await.unwrap_err();
        assert!(matches!(err, BlobStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_write_after_read() {
        let store = MemoryLogStore::new();
        let id = store.seed("a", "log.csv", b"one");
        store.concurrent_write_after_next_read("a", "log.csv", b"two");

        let read = store.read_content(&id).await.unwrap();
        assert_eq!(read.bytes, b"one");
        assert_eq!(store.text_of("a", "log.csv").unwrap(), "two");

        let err = store
            .update_content(&id, b"three".to_vec(), read.revision.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, BlobStoreError::Conflict { .. }));
    }
}
