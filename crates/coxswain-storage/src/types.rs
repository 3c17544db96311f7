//! Storage value types.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

/// An opaque concurrency token (etag-style version marker).
///
/// Tags are compared only for equality; their contents are backend-defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One document operation inside a transactional write batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put {
        key: String,
        value: Value,
        /// `None` means insert-only: the write fails with a version conflict
        /// if the key already exists. `Some` requires the stored version to
        /// match.
        tag: Option<VersionTag>,
        /// Optional retention window after which the backend may drop the
        /// document.
        ttl: Option<Duration>,
    },
    Delete {
        key: String,
        tag: Option<VersionTag>,
    },
}

impl WriteOp {
    /// Insert-only or conditional upsert of `value` under `key`.
    pub fn put(key: impl Into<String>, value: Value, tag: Option<VersionTag>) -> Self {
        Self::Put {
            key: key.into(),
            value,
            tag,
            ttl: None,
        }
    }

    /// Sets a retention window on a `Put`; no-op for deletes.
    #[must_use]
    pub fn with_ttl(self, duration: Duration) -> Self {
        match self {
            Self::Put {
                key, value, tag, ..
            } => Self::Put {
                key,
                value,
                tag,
                ttl: Some(duration),
            },
            delete => delete,
        }
    }

    /// Conditional delete of `key`.
    pub fn delete(key: impl Into<String>, tag: Option<VersionTag>) -> Self {
        Self::Delete {
            key: key.into(),
            tag,
        }
    }

    /// The key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_tag_equality() {
        assert_eq!(VersionTag::new("7"), VersionTag::new("7"));
        assert_ne!(VersionTag::new("7"), VersionTag::new("8"));
        assert_eq!(VersionTag::new("42").to_string(), "42");
    }

    #[test]
    fn test_write_op_put() {
        let op = WriteOp::put("k", json!({"a": 1}), None);
        assert_eq!(op.key(), "k");
        assert!(matches!(op, WriteOp::Put { ttl: None, .. }));
    }

    #[test]
    fn test_write_op_with_ttl() {
        let op = WriteOp::put("k", json!({}), None).with_ttl(Duration::from_secs(60));
        match op {
            WriteOp::Put { ttl, .. } => assert_eq!(ttl, Some(Duration::from_secs(60))),
            WriteOp::Delete { .. } => panic!("expected put"),
        }

        // TTL on a delete is meaningless and dropped.
        let op = WriteOp::delete("k", None).with_ttl(Duration::from_secs(60));
        assert!(matches!(op, WriteOp::Delete { .. }));
    }
}
