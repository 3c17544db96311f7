//! The client-visible resource model.
//!
//! A resource is an opaque bag of `properties` (desired state, written by
//! clients) plus a `status` bag (actual state, written by reconciliation) and
//! control-plane-owned `systemData`. The control plane never interprets the
//! property schema beyond the conventional `provisioningState` field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conventional property carrying the provisioning state.
pub const PROVISIONING_STATE: &str = "provisioningState";

/// Well-known provisioning state values.
pub mod state {
    pub const UPDATING: &str = "Updating";
    pub const DELETING: &str = "Deleting";
    pub const SUCCEEDED: &str = "Succeeded";
    pub const FAILED: &str = "Failed";
    pub const CANCELED: &str = "Canceled";
}

/// Returns true when `value` is one of the recognized terminal provisioning
/// states. The empty string counts as terminal: a resource that has never
/// been reconciled has no operation in flight.
pub fn is_terminal_state(value: &str) -> bool {
    matches!(
        value,
        "" | state::SUCCEEDED | state::FAILED | state::CANCELED
    )
}

/// Mint a fresh resource uid.
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Control-plane-owned metadata. Never client-writable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemData {
    /// Monotonic counter of accepted desired-state changes.
    pub generation: i64,
    /// The generation whose reconciliation has been confirmed complete.
    #[serde(rename = "statusGeneration")]
    pub status_generation: i64,
    /// Assigned once at first creation; immutable for the resource lifetime.
    pub uid: String,
    /// True once a delete has been accepted.
    #[serde(rename = "isDeleting")]
    pub is_deleting: bool,
}

/// A managed resource record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub status: Map<String, Value>,
    #[serde(rename = "systemData", default)]
    pub system_data: SystemData,
}

impl Resource {
    /// The current `provisioningState` property, or `""` when unset or not a
    /// string.
    pub fn provisioning_state(&self) -> &str {
        self.properties
            .get(PROVISIONING_STATE)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Returns a copy with `provisioningState` set to `value`.
    ///
    /// State transitions are pure functions returning a new value; callers
    /// must persist the result explicitly.
    #[must_use]
    pub fn with_provisioning_state(mut self, value: &str) -> Self {
        self.properties
            .insert(PROVISIONING_STATE.to_string(), Value::String(value.into()));
        self
    }

    /// Returns a copy with `provisioningState` set to `value` only when the
    /// current state is absent or terminal. A non-terminal state means an
    /// operation is already in flight and is left alone; the new write joins
    /// the in-progress operation.
    #[must_use]
    pub fn with_provisioning_state_if_terminal(self, value: &str) -> Self {
        if is_terminal_state(self.provisioning_state()) {
            self.with_provisioning_state(value)
        } else {
            self
        }
    }

    /// Returns a copy with the given status bag.
    #[must_use]
    pub fn with_status(mut self, status: Map<String, Value>) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Resource {
        Resource {
            name: "a".into(),
            id: "/planes/radius/local/resourcegroups/default/providers/applications.core/containers/a".into(),
            resource_type: "applications.core/containers".into(),
            scope: "/planes/radius/local/resourcegroups/default".into(),
            properties: Map::new(),
            status: Map::new(),
            system_data: SystemData {
                generation: 1,
                status_generation: 0,
                uid: new_uid(),
                is_deleting: false,
            },
        }
    }

    #[test]
    fn test_provisioning_state_default_empty() {
        assert_eq!(sample().provisioning_state(), "");
    }

    #[test]
    fn test_provisioning_state_ignores_non_string() {
        let mut resource = sample();
        resource
            .properties
            .insert(PROVISIONING_STATE.into(), json!(42));
        assert_eq!(resource.provisioning_state(), "");
    }

    #[test]
    fn test_with_provisioning_state_is_pure() {
        let original = sample();
        let updated = original.clone().with_provisioning_state(state::UPDATING);
        assert_eq!(original.provisioning_state(), "");
        assert_eq!(updated.provisioning_state(), state::UPDATING);
    }

    #[test]
    fn test_with_provisioning_state_if_terminal() {
        // Unset state counts as terminal: the write starts a new operation.
        let resource = sample().with_provisioning_state_if_terminal(state::UPDATING);
        assert_eq!(resource.provisioning_state(), state::UPDATING);

        // A non-terminal state is left alone (the write joins the in-flight
        // operation).
        let resource = resource.with_provisioning_state_if_terminal(state::DELETING);
        assert_eq!(resource.provisioning_state(), state::UPDATING);

        // Terminal states admit a new transition.
        let resource = resource
            .with_provisioning_state(state::SUCCEEDED)
            .with_provisioning_state_if_terminal(state::DELETING);
        assert_eq!(resource.provisioning_state(), state::DELETING);
    }

    #[test]
    fn test_is_terminal_state() {
        assert!(is_terminal_state(""));
        assert!(is_terminal_state(state::SUCCEEDED));
        assert!(is_terminal_state(state::FAILED));
        assert!(is_terminal_state(state::CANCELED));
        assert!(!is_terminal_state(state::UPDATING));
        assert!(!is_terminal_state(state::DELETING));
    }

    #[test]
    fn test_serialization_shape() {
        let resource = sample().with_provisioning_state(state::UPDATING);
        let value = serde_json::to_value(&resource).unwrap();

        assert_eq!(value["name"], "a");
        assert_eq!(value["type"], "applications.core/containers");
        assert_eq!(value["properties"]["provisioningState"], "Updating");
        assert_eq!(value["systemData"]["generation"], 1);
        assert_eq!(value["systemData"]["statusGeneration"], 0);
        assert_eq!(value["systemData"]["isDeleting"], false);
        // Empty status bag is omitted from the wire shape.
        assert!(value.get("status").is_none());
    }

    #[test]
    fn test_deserialization_roundtrip() {
        let resource = sample().with_provisioning_state(state::SUCCEEDED);
        let json = serde_json::to_string(&resource).unwrap();
        let parsed: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, resource);
    }

    #[test]
    fn test_new_uid_is_unique() {
        assert_ne!(new_uid(), new_uid());
    }
}
