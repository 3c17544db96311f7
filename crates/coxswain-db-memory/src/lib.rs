//! In-memory [`DocumentStore`] backend.
//!
//! Provides the full adapter contract the control plane needs (conditional
//! writes, atomic multi-document transactions, scope+type queries, TTL) plus
//! an in-process outbox channel standing in for the publish/subscribe
//! transport.
//!
//! [`DocumentStore`]: coxswain_storage::DocumentStore

pub mod outbox;
pub mod store;

pub use outbox::{OutboxReceiver, OutboxSender, outbox_channel};
pub use store::MemoryStore;
