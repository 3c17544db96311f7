//! Identity and path model.
//!
//! Resource ids are hierarchical paths of the form
//! `{scope}/providers/{namespace}/{type}/{name}`, where the scope itself is a
//! plane-rooted path such as `/planes/radius/local/resourceGroups/default`.
//! The canonical id is the lower-cased path; all parsing is case-insensitive.

use crate::error::{CoreError, Result};

/// Parsed identity of a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    /// Canonical (lower-cased) id.
    pub id: String,
    /// Portion of the path before the `/providers/` segment.
    pub scope: String,
    /// Fully qualified resource type, e.g. `applications.core/containers`.
    pub resource_type: String,
    /// Resource name (last path segment).
    pub name: String,
}

/// Parsed identity of a resource collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    /// Canonical (lower-cased) collection id.
    pub id: String,
    pub scope: String,
    pub resource_type: String,
}

fn split_providers(path: &str) -> Result<(String, String)> {
    let lower = path.to_lowercase();
    match lower.split_once("/providers/") {
        Some((scope, rest)) if !rest.is_empty() => (
            Ok((scope.to_string(), rest.to_string()))
        ),
        _ => Err(CoreError::invalid_path(path)),
    }
}

/// Parse a collection path such as
/// `{scope}/providers/{namespace}/{type}`.
pub fn parse_collection(path: &str) -> Result<CollectionPath> {
    let (scope, resource_type) = split_providers(path)?;
    Ok(CollectionPath {
        id: format!("{scope}/providers/{resource_type}"),
        scope,
        resource_type,
    })
}

/// Parse a resource path such as
/// `{scope}/providers/{namespace}/{type}/{name}`.
pub fn parse_resource(path: &str) -> Result<ResourcePath> {
    let (scope, rest) = split_providers(path)?;
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(CoreError::invalid_path(path));
    }

    let resource_type = parts[..parts.len() - 1].join("/");
    let name = parts[parts.len() - 1].to_string();
    let id = format!("{scope}/providers/{resource_type}/{name}");

    Ok(ResourcePath {
        id,
        scope,
        resource_type,
        name,
    })
}

/// Extract the plane scope (first three segments) from a path, e.g.
/// `/planes/radius/local`.
pub fn parse_plane_scope(path: &str) -> Result<String> {
    let lower = path.to_lowercase();
    let parts: Vec<&str> = lower.trim_start_matches('/').split('/').collect();
    if parts.len() < 3 || parts[..3].iter().any(|p| p.is_empty()) {
        return Err(CoreError::invalid_path(path));
    }
    Ok(format!("/{}", parts[..3].join("/")))
}

/// Extract the provider namespace (first segment of the resource type).
pub fn parse_namespace(path: &str) -> Result<String> {
    let parsed = parse_resource(path)?;
    let namespace = parsed
        .resource_type
        .split('/')
        .next()
        .ok_or_else(|| CoreError::invalid_path(path))?;
    Ok(namespace.to_string())
}

/// Build the operation status id for an operation named `name` belonging to
/// the resource with canonical id `resource_id`.
///
/// Operation statuses live under the resource's plane scope:
/// `{planeScope}/providers/{namespace}/operationStatuses/{name}`.
pub fn operation_status_id(resource_id: &str, name: &str) -> Result<String> {
    let plane_scope = parse_plane_scope(resource_id)?;
    let namespace = parse_namespace(resource_id)?;
    Ok(format!(
        "{plane_scope}/providers/{namespace}/operationStatuses/{name}"
    ))
}
