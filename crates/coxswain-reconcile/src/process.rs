//! The per-resource reconciliation process.
//!
//! One process runs per resource uid. Each iteration waits for an event,
//! verifies the process is still bound to the live resource, decides whether
//! the event is current, and either executes the work and commits the
//! outcome or cancels the superseded operation. All history is re-read from
//! storage at the start of every iteration so a crashed or restarted process
//! never replays stale state.

use std::sync::Arc;
use std::time::Duration;

use coxswain_core::{ErrorDetails, state};
use coxswain_storage::{ResourceStore, StoreError};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::event::{ReconcileEvent, ReconcileInput};
use crate::work::{WorkHandler, WorkItem, WorkResult};

/// Attempts for an optimistic-concurrency commit before giving up on the
/// event. Conflicts re-read and re-decide, so losing here only means a newer
/// change already owns the record.
const COMMIT_ATTEMPTS: u32 = 3;

/// Pause before restarting an iteration after a storage error.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Why a reconciliation process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// No event arrived within the idle timeout.
    Idle,
    /// The resource is gone or its uid changed; this process is orphaned.
    Orphaned,
    /// The event channel closed (engine shutdown).
    Disconnected,
}

/// The generation counters of the live resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationView {
    pub generation: i64,
    pub status_generation: i64,
}

/// Whether an event still describes the latest accepted change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Process,
    Ignore,
}

/// Decides whether an event for `event_generation` should be processed
/// against the `current` counters.
///
/// An event is current only when it carries exactly the live generation and
/// that generation has not already been confirmed. A live generation ahead
/// of the event means a newer change superseded it; behind the event cannot
/// happen under monotonic accepts and is treated as stale. Ignored events
/// still get their operation canceled by the caller.
pub fn decide(current: GenerationView, event_generation: i64) -> Decision {
    if current.generation == event_generation && current.status_generation < event_generation {
        Decision::Process
    } else {
        Decision::Ignore
    }
}

enum Iteration {
    Continue,
    Stop(ExitReason),
}

/// Drives reconciliation for one resource identity.
pub struct Reconciler {
    store: ResourceStore,
    handler: Arc<dyn WorkHandler>,
    idle_timeout: Duration,
}

impl Reconciler {
    pub fn new(store: ResourceStore, handler: Arc<dyn WorkHandler>) -> Self {
        Self {
            store,
            handler,
            idle_timeout: Duration::from_secs(3600),
        }
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Runs the process until it goes idle, is orphaned, or its event
    /// channel closes. Storage errors pause briefly and restart the
    /// iteration with fresh reads.
    pub async fn run(
        &self,
        input: ReconcileInput,
        mut events: mpsc::Receiver<ReconcileEvent>,
    ) -> ExitReason {
        tracing::info!(id = %input.id, uid = %input.uid, "reconciliation process started");
        loop {
            match self.run_iteration(&input, &mut events).await {
                Ok(Iteration::Continue) => {}
                Ok(Iteration::Stop(reason)) => {
                    tracing::info!(
                        id = %input.id,
                        uid = %input.uid,
                        ?reason,
                        "reconciliation process stopped"
                    );
                    return reason;
                }
                Err(err) => {
                    tracing::error!(
                        id = %input.id,
                        uid = %input.uid,
                        error = %err,
                        "reconciliation iteration failed, restarting"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn run_iteration(
        &self,
        input: &ReconcileInput,
        events: &mut mpsc::Receiver<ReconcileEvent>,
    ) -> Result<Iteration, StoreError> {
        // AwaitingEvent.
        let event = match timeout(self.idle_timeout, events.recv()).await {
            Err(_) => return Ok(Iteration::Stop(ExitReason::Idle)),
            Ok(None) => return Ok(Iteration::Stop(ExitReason::Disconnected)),
            Ok(Some(event)) => event,
        };

        // Verifying: this process only acts for the identity it was started
        // for. A recreated resource gets its own process.
        let current = match self.store.read_resource(&input.id).await? {
            Some((resource, _)) if resource.system_data.uid == input.uid => resource,
            _ => return Ok(Iteration::Stop(ExitReason::Orphaned)),
        };

        let view = GenerationView {
            generation: current.system_data.generation,
            status_generation: current.system_data.status_generation,
        };

        match decide(view, event.generation) {
            Decision::Ignore => {
                tracing::debug!(
                    id = %input.id,
                    operation_id = %event.operation_id,
                    event_generation = event.generation,
                    generation = view.generation,
                    status_generation = view.status_generation,
                    "superseded event, canceling its operation"
                );
                self.cancel_operation(&event.operation_id).await?;
            }
            Decision::Process => {
                let result = self
                    .handler
                    .execute(WorkItem {
                        verb: event.operation_type
                            .rsplit('/')
                            .next()
                            .unwrap_or(&event.operation_type)
                            .to_string(),
                        resource: event.resource.clone(),
                    })
                    .await;
                self.commit_outcome(input, &event, result).await?;
            }
        }

        Ok(Iteration::Continue)
    }

    /// Finalizes a superseded operation as `Canceled`. The resource record is
    /// never touched here; only a processed event may advance it.
    async fn cancel_operation(&self, operation_id: &str) -> Result<(), StoreError> {
        for _ in 0..COMMIT_ATTEMPTS {
            let Some((operation, tag)) = self.store.read_operation(operation_id).await? else {
                // Expired or already gone; nobody is polling it.
                return Ok(());
            };
            if operation.status.is_terminal() {
                return Ok(());
            }

            let canceled = operation.finalized(state::CANCELED, Some(ErrorDetails::canceled()));
            match self.store.write_operation(&canceled, Some(&tag)).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Commits the outcome of processed work: the operation reaches its
    /// terminal status and the resource's `statusGeneration` confirms the
    /// event's generation. A successful delete removes the resource record
    /// in the same transaction instead.
    async fn commit_outcome(
        &self,
        input: &ReconcileInput,
        event: &ReconcileEvent,
        result: WorkResult,
    ) -> Result<(), StoreError> {
        let verb = event
            .operation_type
            .rsplit('/')
            .next()
            .unwrap_or(&event.operation_type)
            .to_string();

        for _ in 0..COMMIT_ATTEMPTS {
            let Some((resource, resource_tag)) = self.store.read_resource(&input.id).await? else {
                // Resource disappeared since verification; nothing to update.
                return Ok(());
            };
            if resource.system_data.uid != input.uid {
                return Ok(());
            }

            let Some((operation, operation_tag)) =
                self.store.read_operation(&event.operation_id).await?
            else {
                return Ok(());
            };
            if operation.status.is_terminal() {
                return Ok(());
            }

            let (terminal, error) = match &result.error {
                Some(error) => (state::FAILED, Some(error.clone())),
                None => (state::SUCCEEDED, None),
            };
            let operation = operation.finalized(terminal, error);

            let write = if verb == "DELETE" && terminal == state::SUCCEEDED {
                self.store
                    .write_operation_and_delete_resource(
                        &operation,
                        Some(&operation_tag),
                        &input.id,
                        Some(&resource_tag),
                    )
                    .await
            } else {
                let mut resource = resource.with_provisioning_state(terminal);
                if let Some(status) = &result.status {
                    resource = resource.with_status(status.clone());
                }
                resource.system_data.status_generation = event.generation;
                self.store
                    .write_resource_and_operation(
                        false,
                        &resource,
                        Some(&resource_tag),
                        &operation,
                        Some(&operation_tag),
                    )
                    .await
            };

            match write {
                Ok(()) => return Ok(()),
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        tracing::warn!(
            id = %input.id,
            operation_id = %event.operation_id,
            "commit lost {COMMIT_ATTEMPTS} concurrency races, leaving outcome to the newer change"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
