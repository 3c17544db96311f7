//! Routes committed change notifications to reconciliation instances.
//!
//! Notifications arrive as raw documents from the storage outbox. Only
//! operation documents (recognized by their `operationType` field) are
//! dispatched; resource documents share the outbox and are skipped.

use std::sync::Arc;

use coxswain_core::Operation;
use serde_json::Value;
use thiserror::Error;

use crate::engine::{EngineError, ProcessEngine};
use crate::event::{ReconcileEvent, ReconcileInput};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload looked like an operation but did not parse as one.
    /// Redelivery cannot fix this.
    #[error("malformed operation payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DispatchError {
    /// True when redelivering the same payload can succeed, e.g. after the
    /// target instance went idle between start and delivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}

/// What the dispatcher did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Skipped,
}

/// Turns outbox payloads into reconciliation events.
pub struct Dispatcher {
    engine: Arc<dyn ProcessEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn ProcessEngine>) -> Self {
        Self { engine }
    }

    /// Dispatches one outbox payload: ensures an instance is live for the
    /// operation's resource uid and delivers the event to it.
    ///
    /// Duplicate deliveries are safe end to end: `ensure_started` is
    /// idempotent and the process itself discards already-confirmed
    /// generations.
    pub async fn dispatch(&self, payload: &Value) -> Result<Disposition, DispatchError> {
        if payload.get("operationType").is_none() {
            return Ok(Disposition::Skipped);
        }

        let operation: Operation = serde_json::from_value(payload.clone())?;
        let uid = operation.resource.system_data.uid.clone();
        if uid.is_empty() {
            tracing::warn!(
                operation_id = %operation.status.id,
                "operation payload has no resource uid, skipping"
            );
            return Ok(Disposition::Skipped);
        }

        let input = ReconcileInput {
            id: operation.resource.id.clone(),
            uid: uid.clone(),
        };
        self.engine.ensure_started(input).await?;

        let event = ReconcileEvent::from_operation(&operation);
        tracing::debug!(
            uid = %uid,
            operation_id = %event.operation_id,
            generation = event.generation,
            "dispatching reconciliation event"
        );
        self.engine.raise_event(&uid, event).await?;
        Ok(Disposition::Handled)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
