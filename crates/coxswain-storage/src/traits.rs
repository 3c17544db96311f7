//! Storage traits for the document store abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{VersionTag, WriteOp};

/// A transactional key-value document store with optimistic concurrency.
///
/// Implementations must be thread-safe (`Send + Sync`). The control plane's
/// correctness rests on two properties:
///
/// - a read-then-conditional-write round trip detects concurrent
///   modification (stale tags fail with [`StoreError::VersionConflict`]),
/// - a [`write`](DocumentStore::write) batch is applied all-or-nothing; the
///   resource+operation pair is never persisted one without the other.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the document stored under `key` together with its current
    /// version tag. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing
    /// documents.
    async fn get(&self, key: &str) -> Result<Option<(Value, VersionTag)>, StoreError>;

    /// Applies a batch of writes atomically.
    ///
    /// With `notify` set, the backend additionally guarantees eventual
    /// delivery of one notification per written document once the
    /// transaction commits (the outbox variant).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::VersionConflict` if any supplied tag is stale
    /// (or an insert-only put found an existing document); in that case no
    /// operation in the batch is applied.
    async fn write(&self, writes: Vec<WriteOp>, notify: bool) -> Result<(), StoreError>;

    /// Deletes the document under `key`, conditionally when `tag` is given.
    ///
    /// Deleting an absent key is a no-op.
    async fn delete(&self, key: &str, tag: Option<&VersionTag>) -> Result<(), StoreError>;

    /// Returns all documents whose top-level `scope` and `type` fields match,
    /// ordered by their `name` field ascending.
    async fn query(&self, scope: &str, doc_type: &str) -> Result<Vec<Value>, StoreError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that DocumentStore is object-safe.
    fn _assert_store_object_safe(_: &dyn DocumentStore) {}
}
