//! Typed resource/operation layer over the raw document store.
//!
//! Resource documents are stored under their lower-cased canonical id;
//! operation documents under the operation status id. The two are only ever
//! written together, as one transaction.

use std::sync::Arc;
use std::time::Duration;

use coxswain_core::{Operation, Resource};

use crate::error::StoreError;
use crate::traits::DocumentStore;
use crate::types::{VersionTag, WriteOp};

/// Default retention window for operation documents.
pub const OPERATION_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Typed access to resources and operations in a [`DocumentStore`].
#[derive(Clone)]
pub struct ResourceStore {
    inner: Arc<dyn DocumentStore>,
    operation_ttl: Duration,
}

impl ResourceStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            operation_ttl: OPERATION_TTL,
        }
    }

    /// Override the operation retention window.
    #[must_use]
    pub fn with_operation_ttl(mut self, operation_ttl: Duration) -> Self {
        self.operation_ttl = operation_ttl;
        self
    }

    fn key(id: &str) -> String {
        id.to_lowercase()
    }

    /// Reads a resource and its concurrency token. `None` if absent.
    pub async fn read_resource(
        &self,
        id: &str,
    ) -> Result<Option<(Resource, VersionTag)>, StoreError> {
        match self.inner.get(&Self::key(id)).await? {
            Some((value, tag)) => Ok(Some((serde_json::from_value(value)?, tag))),
            None => Ok(None),
        }
    }

    /// Reads an operation document and its concurrency token.
    pub async fn read_operation(
        &self,
        id: &str,
    ) -> Result<Option<(Operation, VersionTag)>, StoreError> {
        match self.inner.get(&Self::key(id)).await? {
            Some((value, tag)) => Ok(Some((serde_json::from_value(value)?, tag))),
            None => Ok(None),
        }
    }

    /// Writes the resource and its operation as one atomic transaction.
    ///
    /// A `None` tag means insert-only, so a first create can never clobber a
    /// concurrently created record. With `notify` set, the committed write
    /// is published through the store's outbox.
    pub async fn write_resource_and_operation(
        &self,
        notify: bool,
        resource: &Resource,
        resource_tag: Option<&VersionTag>,
        operation: &Operation,
        operation_tag: Option<&VersionTag>,
    ) -> Result<(), StoreError> {
        let writes = vec![
            WriteOp::put(
                Self::key(&resource.id),
                serde_json::to_value(resource)?,
                resource_tag.cloned(),
            ),
            WriteOp::put(
                Self::key(&operation.status.id),
                serde_json::to_value(operation)?,
                operation_tag.cloned(),
            )
            .with_ttl(self.operation_ttl),
        ];

        self.inner.write(writes, notify).await
    }

    /// Finalizes an operation without touching its resource. Used when
    /// cancelling a superseded operation.
    pub async fn write_operation(
        &self,
        operation: &Operation,
        tag: Option<&VersionTag>,
    ) -> Result<(), StoreError> {
        let writes = vec![
            WriteOp::put(
                Self::key(&operation.status.id),
                serde_json::to_value(operation)?,
                tag.cloned(),
            )
            .with_ttl(self.operation_ttl),
        ];

        self.inner.write(writes, false).await
    }

    /// Finalizes a delete operation and removes its resource record in one
    /// transaction.
    pub async fn write_operation_and_delete_resource(
        &self,
        operation: &Operation,
        operation_tag: Option<&VersionTag>,
        resource_id: &str,
        resource_tag: Option<&VersionTag>,
    ) -> Result<(), StoreError> {
        let writes = vec![
            WriteOp::put(
                Self::key(&operation.status.id),
                serde_json::to_value(operation)?,
                operation_tag.cloned(),
            )
            .with_ttl(self.operation_ttl),
            WriteOp::delete(Self::key(resource_id), resource_tag.cloned()),
        ];

        self.inner.write(writes, false).await
    }

    /// Lists resources in a scope, ordered by name ascending.
    pub async fn list_resources(
        &self,
        scope: &str,
        resource_type: &str,
    ) -> Result<Vec<Resource>, StoreError> {
        let values = self.inner.query(scope, resource_type).await?;
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    /// Lists operations under a plane scope + provider namespace, ordered by
    /// name ascending.
    pub async fn list_operations(
        &self,
        scope: &str,
        namespace: &str,
    ) -> Result<Vec<Operation>, StoreError> {
        let doc_type = format!("{}/operationstatuses", namespace.to_lowercase());
        let values = self.inner.query(scope, &doc_type).await?;
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    /// Name of the underlying backend, for logs.
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("backend", &self.inner.backend_name())
            .finish()
    }
}
