//! Reconciliation layer for the Coxswain control plane.
//!
//! A reconciliation process runs per resource identity (uid). It waits for
//! operation events, decides whether each event still describes the latest
//! accepted change, performs the work through a [`WorkHandler`], and commits
//! the outcome back to storage. Events that lost the race are acknowledged by
//! canceling their operation so callers never poll forever.

mod dispatcher;
mod engine;
mod event;
mod process;
mod work;

pub use dispatcher::{DispatchError, Dispatcher, Disposition};
pub use engine::{EngineError, LocalEngine, ProcessEngine, StartOutcome};
pub use event::{ReconcileEvent, ReconcileInput};
pub use process::{Decision, ExitReason, GenerationView, Reconciler, decide};
pub use work::{WorkHandler, WorkItem, WorkResult};
