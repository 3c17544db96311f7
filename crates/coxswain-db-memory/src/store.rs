//! In-memory document store with optimistic concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use coxswain_storage::{DocumentStore, StoreError, VersionTag, WriteOp};

use crate::outbox::OutboxSender;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    version: u64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }

    fn tag(&self) -> VersionTag {
        VersionTag::new(self.version.to_string())
    }
}

/// In-memory store backend.
///
/// Writes take a single map-wide lock, which makes multi-document
/// transactions trivially atomic. Expired documents are treated as absent on
/// read and reclaimed lazily on write.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    version_counter: AtomicU64,
    outbox: Option<OutboxSender>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            version_counter: AtomicU64::new(1),
            outbox: None,
        }
    }

    /// Attaches an outbox sender; notify-enabled writes publish each
    /// committed document to it.
    #[must_use]
    pub fn with_outbox(mut self, outbox: OutboxSender) -> Self {
        self.outbox = Some(outbox);
        self
    }

    fn next_version(&self) -> u64 {
        self.version_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Checks one write op against the current map state without applying
    /// it. `None` tags on puts are insert-only; on deletes, unconditional.
    fn check(entries: &HashMap<String, Entry>, op: &WriteOp) -> Result<(), StoreError> {
        let current = entries.get(op.key()).filter(|e| !e.is_expired());
        match op {
            WriteOp::Put { key, tag, .. } => match (current, tag) {
                (None, None) => Ok(()),
                (None, Some(_)) => Err(StoreError::version_conflict(key)),
                (Some(_), None) => Err(StoreError::version_conflict(key)),
                (Some(entry), Some(tag)) if entry.tag() == *tag => Ok(()),
                (Some(_), Some(_)) => Err(StoreError::version_conflict(key)),
            },
            WriteOp::Delete { key, tag } => match (current, tag) {
                (Some(entry), Some(tag)) if entry.tag() != *tag => {
                    Err(StoreError::version_conflict(key))
                }
                _ => Ok(()),
            },
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<(Value, VersionTag)>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| (entry.value.clone(), entry.tag())))
    }

    async fn write(&self, writes: Vec<WriteOp>, notify: bool) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());

        // Validate the whole batch before touching anything so a stale tag
        // fails the transaction atomically.
        for op in &writes {
            Self::check(&entries, op)?;
        }

        let mut committed = Vec::new();
        for op in writes {
            match op {
                WriteOp::Put {
                    key, value, ttl, ..
                } => {
                    let entry = Entry {
                        value: value.clone(),
                        version: self.next_version(),
                        expires_at: ttl.map(|d| Instant::now() + d),
                    };
                    entries.insert(key, entry);
                    committed.push(value);
                }
                WriteOp::Delete { key, .. } => {
                    entries.remove(&key);
                }
            }
        }
        drop(entries);

        if notify {
            if let Some(outbox) = &self.outbox {
                for value in committed {
                    if outbox.send(value).is_err() {
                        tracing::warn!("outbox receiver dropped; notification lost");
                    }
                }
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str, tag: Option<&VersionTag>) -> Result<(), StoreError> {
        self.write(vec![WriteOp::delete(key, tag.cloned())], false)
            .await
    }

    async fn query(&self, scope: &str, doc_type: &str) -> Result<Vec<Value>, StoreError> {
        let entries = self.entries.read().await;
        let mut matches: Vec<Value> = entries
            .values()
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
            .filter(|value| {
                value.get("scope").and_then(Value::as_str) == Some(scope)
                    && value.get("type").and_then(Value::as_str) == Some(doc_type)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let name_a = a.get("name").and_then(Value::as_str).unwrap_or("");
            let name_b = b.get("name").and_then(Value::as_str).unwrap_or("");
            name_a.cmp(name_b)
        });

        Ok(matches)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
