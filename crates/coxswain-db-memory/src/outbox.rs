//! In-process outbox transport.
//!
//! The store pushes every document committed by a notify-enabled transaction
//! onto this channel; the server's delivery pump feeds them to the
//! notification dispatcher. Delivery is at-least-once from the consumer's
//! point of view: the pump redelivers a payload a bounded number of times on
//! retryable failures before dropping it.

use serde_json::Value;
use tokio::sync::mpsc;

pub type OutboxSender = mpsc::UnboundedSender<Value>;
pub type OutboxReceiver = mpsc::UnboundedReceiver<Value>;

/// Creates the outbox channel pair.
pub fn outbox_channel() -> (OutboxSender, OutboxReceiver) {
    mpsc::unbounded_channel()
}
