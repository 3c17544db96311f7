use coxswain_core::{Operation, Resource};
use serde::{Deserialize, Serialize};

/// Resume token for a reconciliation process. Carries only the resource id
/// and the uid the process is bound to; everything else is re-read from
/// storage so a restarted process never acts on stale history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileInput {
    pub id: String,
    pub uid: String,
}

/// One accepted change delivered to a reconciliation process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileEvent {
    #[serde(rename = "operationType")]
    pub operation_type: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub generation: i64,
    pub uid: String,
    pub resource: Resource,
}

impl ReconcileEvent {
    /// Projects an operation record into the event a process consumes.
    pub fn from_operation(operation: &Operation) -> Self {
        Self {
            operation_type: operation.operation_type.clone(),
            operation_id: operation.status.id.clone(),
            generation: operation.resource.system_data.generation,
            uid: operation.resource.system_data.uid.clone(),
            resource: operation.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coxswain_core::{SystemData, state};

    fn sample_resource(generation: i64) -> Resource {
        Resource {
            name: "web".into(),
            id: "/planes/radius/local/resourcegroups/default/providers/applications.core/containers/web".into(),
            resource_type: "applications.core/containers".into(),
            scope: "/planes/radius/local/resourcegroups/default".into(),
            properties: Default::default(),
            status: Default::default(),
            system_data: SystemData {
                generation,
                status_generation: 0,
                uid: "abc-123".into(),
                is_deleting: false,
            },
        }
    }

    #[test]
    fn test_event_from_operation_carries_generation_and_uid() {
        let operation =
            Operation::for_accepted_write(&sample_resource(4), "PUT", state::UPDATING).unwrap();
        let event = ReconcileEvent::from_operation(&operation);

        assert_eq!(event.operation_type, "APPLICATIONS.CORE/CONTAINERS/PUT");
        assert_eq!(event.operation_id, operation.status.id);
        assert_eq!(event.generation, 4);
        assert_eq!(event.uid, "abc-123");
    }

    #[test]
    fn test_event_wire_shape() {
        let operation =
            Operation::for_accepted_write(&sample_resource(1), "DELETE", state::DELETING).unwrap();

        let value = serde_json::to_value(ReconcileEvent::from_operation(&operation)).unwrap();
        assert_eq!(value["operationType"], "APPLICATIONS.CORE/CONTAINERS/DELETE");
        assert!(
            value["operationId"]
                .as_str()
                .unwrap()
                .contains("/operationStatuses/")
        );
        assert_eq!(value["generation"], 1);
    }
}
