//! HTTP handlers implementing the accept phase of the control plane.
//!
//! Writes never perform the work: they persist the next desired state plus a
//! trackable operation in one transaction and point the client at the
//! operation status. Reconciliation delivers the outcome asynchronously.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use coxswain_api::{ApiError, ApiResponse, OperationStatusList, ResourceList, ResourceRequest};
use coxswain_core::{Operation, Resource, SystemData, ids, is_terminal_state, new_uid, state};

use crate::state::AppState;

/// Lower-cased type suffix of operation status documents.
const OPERATION_TYPE_SUFFIX: &str = "/operationstatuses";

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Coxswain",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

/// GET on any plane-rooted path: single resource, resource collection, or
/// operation status (single or list), decided by the path shape.
pub async fn get_any(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Response, ApiError> {
    let path = format!("/planes/{rest}");

    if let Ok(parsed) = ids::parse_resource(&path) {
        if parsed.resource_type.ends_with(OPERATION_TYPE_SUFFIX) {
            return match state.store.read_operation(&parsed.id).await? {
                Some((operation, _)) => Ok(ApiResponse::ok(operation.status).into_response()),
                None => Err(ApiError::not_found(format!(
                    "operation status {} not found",
                    parsed.id
                ))),
            };
        }
        return match state.store.read_resource(&parsed.id).await? {
            Some((resource, _)) => Ok(ApiResponse::ok(resource).into_response()),
            None => Err(ApiError::not_found(format!(
                "resource {} not found",
                parsed.id
            ))),
        };
    }

    let parsed = ids::parse_collection(&path)?;
    if let Some(namespace) = parsed.resource_type.strip_suffix(OPERATION_TYPE_SUFFIX) {
        let operations = state.store.list_operations(&parsed.scope, namespace).await?;
        let list = OperationStatusList {
            value: operations.into_iter().map(|op| op.status).collect(),
        };
        return Ok(ApiResponse::ok(list).into_response());
    }

    let resources = state
        .store
        .list_resources(&parsed.scope, &parsed.resource_type)
        .await?;
    Ok(ApiResponse::ok(ResourceList { value: resources }).into_response())
}

/// PUT: accept a desired-state change.
pub async fn put_any(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Json(request): Json<ResourceRequest>,
) -> Result<Response, ApiError> {
    let path = format!("/planes/{rest}");
    let parsed = ids::parse_resource(&path)?;
    if parsed.resource_type.ends_with(OPERATION_TYPE_SUFFIX) {
        return Err(ApiError::bad_request(
            "operation statuses are read-only".to_string(),
        ));
    }

    let existing = state.store.read_resource(&parsed.id).await?;
    if let Some((current, _)) = &existing {
        if current.system_data.is_deleting {
            return Err(ApiError::conflict(format!(
                "resource {} is being deleted",
                parsed.id
            )));
        }
    }

    let (system_data, tag, status, current_state) = match existing {
        Some((current, tag)) => (
            SystemData {
                generation: current.system_data.generation + 1,
                status_generation: current.system_data.status_generation,
                uid: current.system_data.uid.clone(),
                is_deleting: false,
            },
            Some(tag),
            current.status.clone(),
            current.provisioning_state().to_string(),
        ),
        None => (
            SystemData {
                generation: 1,
                status_generation: 0,
                uid: new_uid(),
                is_deleting: false,
            },
            None,
            Default::default(),
            String::new(),
        ),
    };

    let resource = Resource {
        name: parsed.name,
        id: parsed.id,
        resource_type: parsed.resource_type,
        scope: parsed.scope,
        properties: request.properties,
        status,
        system_data,
    };
    // A non-terminal state means an operation is in flight; the new write
    // joins it instead of clobbering the state mid-flight.
    let resource = if is_terminal_state(&current_state) {
        resource.with_provisioning_state(state::UPDATING)
    } else {
        resource.with_provisioning_state(&current_state)
    };

    let operation = Operation::for_accepted_write(&resource, "PUT", state::UPDATING)?;
    state
        .store
        .write_resource_and_operation(true, &resource, tag.as_ref(), &operation, None)
        .await?;

    tracing::info!(
        id = %resource.id,
        generation = resource.system_data.generation,
        operation_id = %operation.status.id,
        "accepted write"
    );
    Ok(ApiResponse::ok(resource)
        .with_location(&operation.status.id)
        .into_response())
}

/// DELETE: accept a teardown. Absent resources delete trivially (204).
pub async fn delete_any(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Response, ApiError> {
    let path = format!("/planes/{rest}");
    let parsed = ids::parse_resource(&path)?;
    if parsed.resource_type.ends_with(OPERATION_TYPE_SUFFIX) {
        return Err(ApiError::bad_request(
            "operation statuses are read-only".to_string(),
        ));
    }

    let Some((current, tag)) = state.store.read_resource(&parsed.id).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    if current.system_data.is_deleting {
        return Err(ApiError::conflict(format!(
            "resource {} is already being deleted",
            parsed.id
        )));
    }

    let current_state = current.provisioning_state().to_string();
    let mut resource = current;
    resource.system_data.generation += 1;
    resource.system_data.is_deleting = true;
    let resource = if is_terminal_state(&current_state) {
        resource.with_provisioning_state(state::DELETING)
    } else {
        resource
    };

    let operation = Operation::for_accepted_write(&resource, "DELETE", state::DELETING)?;
    state
        .store
        .write_resource_and_operation(true, &resource, Some(&tag), &operation, None)
        .await?;

    tracing::info!(
        id = %resource.id,
        generation = resource.system_data.generation,
        operation_id = %operation.status.id,
        "accepted delete"
    );
    Ok(ApiResponse::ok(resource)
        .with_location(&operation.status.id)
        .into_response())
}
