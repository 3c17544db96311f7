use async_trait::async_trait;
use coxswain_core::{ErrorDetails, Resource};
use serde_json::{Map, Value};

/// One unit of reconciliation work: make the actual state match the desired
/// state snapshot for the given verb.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// `PUT` or `DELETE`.
    pub verb: String,
    /// The resource snapshot captured when the change was accepted.
    pub resource: Resource,
}

/// The outcome of a unit of work. A populated `error` marks the operation
/// `Failed`; otherwise it succeeds and `status` (if any) becomes the
/// resource's new actual-state bag.
#[derive(Debug, Clone, Default)]
pub struct WorkResult {
    pub status: Option<Map<String, Value>>,
    pub error: Option<ErrorDetails>,
}

impl WorkResult {
    pub fn succeeded(status: Option<Map<String, Value>>) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn failed(error: ErrorDetails) -> Self {
        Self {
            status: None,
            error: Some(error),
        }
    }
}

/// Performs the domain-specific side effects of reconciliation.
///
/// Implementations must be idempotent: a change can be delivered (and
/// therefore executed) more than once before its outcome is committed.
#[async_trait]
pub trait WorkHandler: Send + Sync {
    async fn execute(&self, item: WorkItem) -> WorkResult;
}
