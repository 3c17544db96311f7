use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use coxswain_core::{CoreError, ErrorDetails, ErrorResponse, OperationStatus, Resource};
use coxswain_storage::StoreError;

// -------------------------
// API Errors
// -------------------------

/// High-level API errors mapped to HTTP responses with `{error: {code,
/// message}}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_details(&self) -> ErrorDetails {
        match self {
            ApiError::BadRequest(msg) => ErrorDetails::new("BadRequest", msg),
            ApiError::NotFound(msg) => ErrorDetails::new("NotFound", msg),
            ApiError::Conflict(msg) => ErrorDetails::new("Conflict", msg),
            ApiError::Internal(msg) => ErrorDetails::new("Internal", msg),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPath(_) | CoreError::InvalidResource { .. } => {
                Self::BadRequest(err.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_version_conflict() {
            // A concurrent write won the race; the client should re-read and
            // retry.
            Self::Conflict("the resource was modified concurrently, retry the request".into())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_error_details(),
        };
        let body = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());

        axum::http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}


// -------------------------
// API Response Wrapper
// -------------------------

/// A serializable payload plus status code and extra headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn accepted(value: T) -> Self {
        Self::new(value, StatusCode::ACCEPTED)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Attach the async-operation Location header when the value is valid in
    /// a header.
    pub fn with_location(self, location: &str) -> Self {
        match HeaderValue::from_str(location) {
            Ok(value) => self.with_header(header::LOCATION, value),
            Err(_) => self,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.value).unwrap_or_else(|_| b"{}".to_vec());
        let mut builder = axum::http::Response::builder().status(self.status).header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        builder
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_sets_status_and_content_type() {
        let resp = ApiResponse::ok(json!({"name": "web"})).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
    }

    #[test]
    fn test_accepted_with_location_header() {
        let resp = ApiResponse::accepted(json!({}))
            .with_location("/planes/radius/local/providers/applications.core/operationStatuses/abc")
            .into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(
            resp.headers()
                .get(header::LOCATION)
                .unwrap()
                .to_str()
                .unwrap()
                .ends_with("/operationStatuses/abc")
        );
    }
}

// -------------------------
// Wire Types
// -------------------------

/// The client-writable portion of a PUT body. Everything else on the stored
/// record is control-plane-owned and ignored if sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// List responses wrap their items in a `value` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    pub value: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatusList {
    pub value: Vec<OperationStatus>,
}
