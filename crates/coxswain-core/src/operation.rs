//! Tracked operation records.
//!
//! Every accepted write creates an operation: a snapshot of the resource at
//! accept time plus a client-pollable status record. The status moves from
//! `Updating`/`Deleting` to exactly one terminal state and is then immutable.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::Result;
use crate::ids;
use crate::resource::{Resource, is_terminal_state, state};
use crate::time::now_utc;

/// A stored operation document.
///
/// The top-level `scope` and `type` fields mirror the resource documents so
/// operations are listable through the same scope+type index; `type` is
/// always `{namespace}/operationstatuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Resource type + verb, e.g. `APPLICATIONS.CORE/CONTAINERS/PUT`.
    #[serde(rename = "operationType")]
    pub operation_type: String,
    /// The operation name, duplicated from the status record so list queries
    /// order operation documents by name like resource documents.
    pub name: String,
    pub scope: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Snapshot of the resource at accept time. Carries the generation this
    /// operation corresponds to.
    pub resource: Resource,
    /// The client-visible status record.
    #[serde(rename = "operation")]
    pub status: OperationStatus,
}

impl Operation {
    /// Build a new operation for an accepted write against `resource`,
    /// with a freshly generated name and the given verb (`PUT`/`DELETE`).
    pub fn for_accepted_write(resource: &Resource, verb: &str, initial_state: &str) -> Result<Self> {
        let name = uuid::Uuid::new_v4().to_string();
        let id = ids::operation_status_id(&resource.id, &name)?;
        let namespace = ids::parse_namespace(&resource.id)?;

        Ok(Self {
            operation_type: format!("{}/{verb}", resource.resource_type.to_uppercase()),
            name: name.clone(),
            scope: ids::parse_plane_scope(&resource.id)?,
            doc_type: format!("{namespace}/operationstatuses"),
            resource: resource.clone(),
            status: OperationStatus {
                id,
                name,
                status: initial_state.to_string(),
                start_time: now_utc(),
                end_time: None,
                error: None,
            },
        })
    }

    /// The verb portion of the operation type (`PUT`, `DELETE`).
    pub fn verb(&self) -> &str {
        self.operation_type
            .rsplit('/')
            .next()
            .unwrap_or(&self.operation_type)
    }

    /// Returns a copy finalized to the terminal `status`, stamping the end
    /// time and optional error. Finalization happens exactly once; calling
    /// this on an already-terminal operation is a caller bug upstream and is
    /// left to the staleness checks to prevent.
    #[must_use]
    pub fn finalized(mut self, status: &str, error: Option<ErrorDetails>) -> Self {
        self.status.status = status.to_string();
        self.status.end_time = Some(now_utc());
        self.status.error = error;
        self
    }
}

/// The pollable status of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    /// The operation status id (also its storage key).
    pub id: String,
    /// The operation name (last id segment).
    pub name: String,
    /// Current provisioning state of the tracked change.
    pub status: String,
    #[serde(rename = "startTime", with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(
        rename = "endTime",
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub end_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

impl OperationStatus {
    /// True once the operation has reached `Succeeded`, `Failed` or
    /// `Canceled`.
    pub fn is_terminal(&self) -> bool {
        !self.status.is_empty() && is_terminal_state(&self.status)
    }
}

/// Structured error captured by a failed or cancelled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ErrorDetails {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The standard error attached to operations superseded by a newer
    /// change.
    pub fn canceled() -> Self {
        Self::new(
            state::CANCELED,
            "Operation was canceled because the resource is already up to date \
             or another operation was started.",
        )
    }
}

/// The `{error: {code, message}}` body shape for API errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{SystemData, new_uid};

    fn sample_resource() -> Resource {
        Resource {
            name: "web".into(),
            id: "/planes/radius/local/resourcegroups/default/providers/applications.core/containers/web".into(),
            resource_type: "applications.core/containers".into(),
            scope: "/planes/radius/local/resourcegroups/default".into(),
            properties: Default::default(),
            status: Default::default(),
            system_data: SystemData {
                generation: 3,
                status_generation: 2,
                uid: new_uid(),
                is_deleting: false,
            },
        }
    }

    #[test]
    fn test_for_accepted_write() {
        let resource = sample_resource();
        let operation =
            Operation::for_accepted_write(&resource, "PUT", state::UPDATING).unwrap();

        assert_eq!(
            operation.operation_type,
            "APPLICATIONS.CORE/CONTAINERS/PUT"
        );
        assert_eq!(operation.scope, "/planes/radius/local");
        assert_eq!(operation.doc_type, "applications.core/operationstatuses");
        assert_eq!(operation.name, operation.status.name);
        assert_eq!(operation.resource.system_data.generation, 3);
        assert_eq!(operation.status.status, state::UPDATING);
        assert!(operation.status.end_time.is_none());
        assert!(
            operation
                .status
                .id
                .ends_with(&format!("/operationStatuses/{}", operation.status.name))
        );
    }

    #[test]
    fn test_verb() {
        let operation =
            Operation::for_accepted_write(&sample_resource(), "DELETE", state::DELETING).unwrap();
        assert_eq!(operation.verb(), "DELETE");
    }

    #[test]
    fn test_finalized() {
        let operation =
            Operation::for_accepted_write(&sample_resource(), "PUT", state::UPDATING).unwrap();
        assert!(!operation.status.is_terminal());

        let failed = operation.finalized(
            state::FAILED,
            Some(ErrorDetails::new("Internal", "provisioning blew up")),
        );
        assert!(failed.status.is_terminal());
        assert!(failed.status.end_time.is_some());
        assert_eq!(failed.status.error.as_ref().unwrap().code, "Internal");
    }

    #[test]
    fn test_status_serialization_shape() {
        let operation =
            Operation::for_accepted_write(&sample_resource(), "PUT", state::UPDATING).unwrap();
        let value = serde_json::to_value(&operation).unwrap();

        assert!(value["operationType"].is_string());
        assert_eq!(value["type"], "applications.core/operationstatuses");
        assert_eq!(value["name"], value["operation"]["name"]);
        assert!(value["operation"]["startTime"].is_string());
        assert!(value["operation"].get("endTime").is_none());
        assert!(value["operation"].get("error").is_none());
        assert_eq!(value["resource"]["systemData"]["generation"], 3);
    }

    #[test]
    fn test_operation_roundtrip() {
        let operation = Operation::for_accepted_write(&sample_resource(), "PUT", state::UPDATING)
            .unwrap()
            .finalized(state::CANCELED, Some(ErrorDetails::canceled()));
        let json = serde_json::to_string(&operation).unwrap();
        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, operation);
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse {
            error: ErrorDetails::new("NotFound", "resource not found"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"]["code"], "NotFound");
        assert_eq!(value["error"]["message"], "resource not found");
    }
}
