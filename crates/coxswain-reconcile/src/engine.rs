//! Process-engine seam: starting reconciliation instances and routing
//! events to them.
//!
//! The engine keys instances by resource uid so exactly one process handles
//! a given identity at a time. [`LocalEngine`] runs each instance as a tokio
//! task inside this process; a durable engine would implement the same trait
//! over external infrastructure.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::{ReconcileEvent, ReconcileInput};
use crate::process::Reconciler;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No live instance for the uid. Retryable: re-ensuring the instance and
    /// redelivering the event recovers.
    #[error("no active reconciliation instance for uid {uid}")]
    InstanceNotFound { uid: String },
    /// The instance exists but its event queue is full.
    #[error("event queue full for uid {uid}")]
    QueueFull { uid: String },
}

/// Result of [`ProcessEngine::ensure_started`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Starts reconciliation instances and delivers events to them.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
    /// Starts an instance for the input's uid unless one is already live.
    async fn ensure_started(&self, input: ReconcileInput) -> Result<StartOutcome, EngineError>;

    /// Delivers an event to the live instance for `uid`.
    async fn raise_event(&self, uid: &str, event: ReconcileEvent) -> Result<(), EngineError>;
}

/// In-process engine backed by tokio tasks.
pub struct LocalEngine {
    reconciler: Arc<Reconciler>,
    instances: Arc<DashMap<String, mpsc::Sender<ReconcileEvent>>>,
    event_buffer: usize,
}

impl LocalEngine {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            instances: Arc::new(DashMap::new()),
            event_buffer: 32,
        }
    }

    #[must_use]
    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    /// Number of live instances, for logs and tests.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[async_trait]
impl ProcessEngine for LocalEngine {
    async fn ensure_started(&self, input: ReconcileInput) -> Result<StartOutcome, EngineError> {
        match self.instances.entry(input.uid.clone()) {
            Entry::Occupied(_) => Ok(StartOutcome::AlreadyRunning),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.event_buffer);
                slot.insert(tx);

                let reconciler = Arc::clone(&self.reconciler);
                let instances = Arc::clone(&self.instances);
                let uid = input.uid.clone();
                tokio::spawn(async move {
                    reconciler.run(input, rx).await;
                    instances.remove(&uid);
                });
                Ok(StartOutcome::Started)
            }
        }
    }

    async fn raise_event(&self, uid: &str, event: ReconcileEvent) -> Result<(), EngineError> {
        // Clone the sender out so the shard lock is not held across the send.
        let Some(sender) = self.instances.get(uid).map(|entry| entry.value().clone()) else {
            return Err(EngineError::InstanceNotFound {
                uid: uid.to_string(),
            });
        };

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            // The instance exited between lookup and send.
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::InstanceNotFound {
                uid: uid.to_string(),
            }),
            Err(mpsc::error::TrySendError::Full(_)) => Err(EngineError::QueueFull {
                uid: uid.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("instances", &self.instances.len())
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}
