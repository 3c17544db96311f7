pub mod error;
pub mod ids;
pub mod operation;
pub mod resource;
pub mod time;

pub use error::{CoreError, Result};
pub use ids::{
    CollectionPath, ResourcePath, operation_status_id, parse_collection, parse_namespace,
    parse_plane_scope, parse_resource,
};
pub use operation::{ErrorDetails, ErrorResponse, Operation, OperationStatus};
pub use resource::{
    PROVISIONING_STATE, Resource, SystemData, is_terminal_state, new_uid,
    state,
};
pub use time::now_utc;
