//! End-to-end control-plane flows: accept over HTTP, reconcile in the
//! background, observe outcomes through the operation status and resource
//! records.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use coxswain_server::ServerBuilder;
use coxswain_server::config::AppConfig;

const CONTAINER: &str =
    "/planes/radius/local/resourceGroups/default/providers/Applications.Core/containers/web";

fn fast_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.provisioner.delay_ms = 10;
    cfg.reconcile.idle_timeout_secs = 5;
    cfg.reconcile.redeliver_delay_ms = 20;
    cfg
}

/// Router plus a running delivery pump.
fn control_plane() -> Router {
    let mut server = ServerBuilder::new().with_config(fast_config()).build();
    let app = server.app();
    server
        .start_pump()
        .expect("pump starts once per server");
    app
}

fn put_request(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn delete_request(path: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location_of(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("accepted writes carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Sends a write, retrying on 409 version conflicts as a client would when
/// an accept races a reconciliation commit.
async fn send_accepted(app: &Router, make: impl Fn() -> Request<Body>) -> Response<Body> {
    for _ in 0..50 {
        let response = app.clone().oneshot(make()).await.unwrap();
        if response.status() != StatusCode::CONFLICT {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("write kept conflicting");
}

/// Polls the operation status until it leaves `Updating`/`Deleting`.
async fn await_terminal(app: &Router, operation_location: &str) -> Value {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get_request(operation_location))
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            let body = body_json(response).await;
            let status = body["status"].as_str().unwrap_or_default().to_string();
            if !matches!(status.as_str(), "Updating" | "Deleting") {
                return body;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("operation at {operation_location} never reached a terminal status");
}

#[tokio::test]
async fn test_put_reconciles_to_succeeded() {
    let app = control_plane();

    let response = app
        .clone()
        .oneshot(put_request(CONTAINER, json!({"properties": {"image": "nginx"}})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let location = location_of(&response);

    let operation = await_terminal(&app, &location).await;
    assert_eq!(operation["status"], "Succeeded");
    assert!(operation["endTime"].is_string());

    let response = app.clone().oneshot(get_request(CONTAINER)).await.unwrap();
    let resource = body_json(response).await;
    assert_eq!(resource["properties"]["provisioningState"], "Succeeded");
    assert_eq!(resource["systemData"]["generation"], 1);
    assert_eq!(resource["systemData"]["statusGeneration"], 1);
    assert_eq!(resource["status"]["observedGeneration"], 1);
}

#[tokio::test]
async fn test_failed_provisioning_reports_failure() {
    let app = control_plane();

    let response = app
        .clone()
        .oneshot(put_request(
            CONTAINER,
            json!({"properties": {"provisioningError": "quota exceeded"}}),
        ))
        .await
        .unwrap();
    let location = location_of(&response);

    let operation = await_terminal(&app, &location).await;
    assert_eq!(operation["status"], "Failed");
    assert_eq!(operation["error"]["code"], "ProvisioningFailed");
    assert_eq!(operation["error"]["message"], "quota exceeded");

    let response = app.clone().oneshot(get_request(CONTAINER)).await.unwrap();
    let resource = body_json(response).await;
    assert_eq!(resource["properties"]["provisioningState"], "Failed");
    assert_eq!(resource["systemData"]["statusGeneration"], 1);
}

#[tokio::test]
async fn test_delete_removes_resource() {
    let app = control_plane();

    let response = app
        .clone()
        .oneshot(put_request(CONTAINER, json!({"properties": {}})))
        .await
        .unwrap();
    await_terminal(&app, &location_of(&response)).await;

    let response = app.clone().oneshot(delete_request(CONTAINER)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let delete_location = location_of(&response);
    let body = body_json(response).await;
    assert_eq!(body["systemData"]["isDeleting"], true);

    // The terminal delete operation stays pollable after the resource is
    // gone.
    let operation = await_terminal(&app, &delete_location).await;
    assert_eq!(operation["status"], "Succeeded");

    let response = app.clone().oneshot(get_request(CONTAINER)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_superseded_write_still_terminates_both_operations() {
    let app = control_plane();

    // Two accepts in quick succession. Depending on scheduling, the first
    // either completes before the second is accepted or is superseded and
    // canceled; it must terminate either way.
    let first = app
        .clone()
        .oneshot(put_request(CONTAINER, json!({"properties": {"rev": 1}})))
        .await
        .unwrap();
    let first_location = location_of(&first);

    let second = send_accepted(&app, || {
        put_request(CONTAINER, json!({"properties": {"rev": 2}}))
    })
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second_location = location_of(&second);

    let second_op = await_terminal(&app, &second_location).await;
    assert_eq!(second_op["status"], "Succeeded");

    let first_op = await_terminal(&app, &first_location).await;
    assert!(
        matches!(
            first_op["status"].as_str().unwrap(),
            "Succeeded" | "Canceled"
        ),
        "superseded operation left non-terminal: {first_op}"
    );
    if first_op["status"] == "Canceled" {
        assert_eq!(first_op["error"]["code"], "Canceled");
    }

    // The newest generation is the one confirmed.
    let response = app.clone().oneshot(get_request(CONTAINER)).await.unwrap();
    let resource = body_json(response).await;
    assert_eq!(resource["systemData"]["generation"], 2);
    assert_eq!(resource["systemData"]["statusGeneration"], 2);
    assert_eq!(resource["properties"]["rev"], 2);
}

#[tokio::test]
async fn test_delete_supersedes_inflight_update() {
    let app = control_plane();

    let update = app
        .clone()
        .oneshot(put_request(CONTAINER, json!({"properties": {"rev": 1}})))
        .await
        .unwrap();
    let update_location = location_of(&update);

    let delete = send_accepted(&app, || delete_request(CONTAINER)).await;
    assert_eq!(delete.status(), StatusCode::OK);
    let delete_location = location_of(&delete);

    let delete_op = await_terminal(&app, &delete_location).await;
    assert_eq!(delete_op["status"], "Succeeded");
    let update_op = await_terminal(&app, &update_location).await;
    assert!(matches!(
        update_op["status"].as_str().unwrap(),
        "Succeeded" | "Canceled"
    ));

    let response = app.clone().oneshot(get_request(CONTAINER)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
