//! Storage abstraction layer for the Coxswain control plane.
//!
//! The control plane talks to a transactional key-value document store
//! through the [`DocumentStore`] trait: conditional (version-tagged) writes,
//! all-or-nothing multi-document transactions with an optional outbox
//! notification, and scope+type secondary-index queries.
//!
//! [`ResourceStore`] layers the resource/operation document model on top and
//! is what handlers and the reconciler actually use.

pub mod error;
pub mod resources;
pub mod traits;
pub mod types;

pub use error::StoreError;
pub use resources::{OPERATION_TTL, ResourceStore};
pub use traits::DocumentStore;
pub use types::{VersionTag, WriteOp};
