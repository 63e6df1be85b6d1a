//! Integration tests for the RPC handler and HTTP router.

#[allow(dead_code)]
mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use scenelock::resilience::RetryConfig;
use scenelock::rpc::{router, RpcRequest, RpcResponse};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post_rpc(app: axum::Router, payload: Value) -> RpcResponse {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = router(rpc_handler(RetryConfig::no_retry()));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_scene_session_over_http() {
    let app = router(rpc_handler(RetryConfig::no_retry()));
    let scene = serde_json::to_value(sample_scene()).expect("scene json");

    let response = post_rpc(
        app.clone(),
        json!({"id": 1, "owner": "ui-1", "request": "OpenScene", "args": {"scene": scene}}),
    )
    .await;
    assert!(response.result, "{:?}", response.messages);

    let response = post_rpc(
        app.clone(),
        json!({"id": 2, "owner": "ui-1", "request": "WriteLock", "args": {"object_id": "obj1", "lock_tree": true}}),
    )
    .await;
    assert_eq!(response.id, 2);
    assert_eq!(response.request, "WriteLock");
    assert!(response.result);

    let response = post_rpc(
        app.clone(),
        json!({"id": 3, "owner": "ui-2", "request": "ReadLock", "args": {"object_id": "obj1"}}),
    )
    .await;
    assert!(!response.result);
    assert_eq!(response.messages, vec!["Locking of object obj1 failed"]);

    let response = post_rpc(
        app.clone(),
        json!({"id": 4, "owner": "ui-1", "request": "CloseScene"}),
    )
    .await;
    assert!(!response.result);

    let response = post_rpc(
        app.clone(),
        json!({"id": 5, "owner": "ui-1", "request": "WriteUnlock", "args": {"object_id": "obj1"}}),
    )
    .await;
    assert!(response.result);

    let response = post_rpc(
        app,
        json!({"id": 6, "owner": "ui-1", "request": "LockedRootCount"}),
    )
    .await;
    assert_eq!(response.data, Some(json!(0)));
}

#[tokio::test]
async fn test_malformed_request_rejected() {
    let app = router(rpc_handler(RetryConfig::no_retry()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"id": 1, "owner": "ui-1", "request": "Teleport"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_project_locks_follow_parents() {
    let handler = rpc_handler(RetryConfig::no_retry());
    let mut envelopes = EnvelopeBuilder::new();

    let response = handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::OpenProject {
                project: sample_project(),
            },
        ))
        .await;
    assert!(response.result);

    // Scene editing is not available while the project is open.
    let response = handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::OpenScene {
                scene: sample_scene(),
            },
        ))
        .await;
    assert!(!response.result);

    let response = handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::WriteLock {
                object_id: "ap1".to_string(),
                lock_tree: true,
            },
        ))
        .await;
    assert!(response.result);

    let response = handler
        .handle(envelopes.build(
            "ui-2",
            RpcRequest::ReadLock {
                object_id: "ap1_child".to_string(),
            },
        ))
        .await;
    assert!(!response.result);

    let response = handler
        .handle(envelopes.build(
            "ui-2",
            RpcRequest::ReadLock {
                object_id: "unknown".to_string(),
            },
        ))
        .await;
    assert_eq!(response.messages, vec!["Unknown object: unknown"]);

    let response = handler
        .handle(envelopes.build("ui-1", RpcRequest::ReleaseOwnerLocks))
        .await;
    assert_eq!(response.data, Some(json!(1)));

    let response = handler
        .handle(envelopes.build("ui-1", RpcRequest::CloseProject))
        .await;
    assert_eq!(response.data, Some(json!("project1")));
}

#[tokio::test]
async fn test_unlock_errors_are_reported() {
    let handler = rpc_handler(RetryConfig::no_retry());
    let mut envelopes = EnvelopeBuilder::new();

    handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::OpenScene {
                scene: sample_scene(),
            },
        ))
        .await;
    handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::WriteLock {
                object_id: "obj1".to_string(),
                lock_tree: false,
            },
        ))
        .await;

    let response = handler
        .handle(envelopes.build(
            "ui-2",
            RpcRequest::WriteUnlock {
                object_id: "obj1".to_string(),
            },
        ))
        .await;
    assert!(!response.result);
    assert_eq!(response.messages, vec!["Object obj1 is not locked by ui-2"]);

    let response = handler
        .handle(envelopes.build(
            "ui-2",
            RpcRequest::ReadUnlock {
                object_id: "obj2".to_string(),
            },
        ))
        .await;
    assert_eq!(response.messages, vec!["Object obj2 is not locked"]);
}

#[tokio::test(start_paused = true)]
async fn test_lock_request_waits_for_release() {
    let handler = rpc_handler(fast_retry(5));
    let mut envelopes = EnvelopeBuilder::new();

    handler
        .handle(envelopes.build(
            "ui-1",
            RpcRequest::OpenScene {
                scene: sample_scene(),
            },
        ))
        .await;
    let manager = handler.state().lock_manager();
    manager.write_lock("obj1", "ui-1", false).unwrap();

    let releaser = manager.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        releaser.write_unlock("obj1", "ui-1").unwrap();
    });

    let response = handler
        .handle(envelopes.build(
            "ui-2",
            RpcRequest::ReadLock {
                object_id: "obj1".to_string(),
            },
        ))
        .await;

    assert!(response.result);
    assert!(manager.is_read_locked("obj1", "ui-2").unwrap());
}

#[tokio::test]
async fn test_is_read_locked_over_http() {
    let app = router(rpc_handler(RetryConfig::no_retry()));
    let project = serde_json::to_value(sample_project()).expect("project json");

    let response = post_rpc(
        app.clone(),
        json!({"id": 1, "owner": "ui-1", "request": "IsReadLocked", "args": {"object_id": "ap1", "owner": "ui-1"}}),
    )
    .await;
    assert!(!response.result);
    assert_eq!(
        response.messages,
        vec!["Precondition failed: Scene or project has to be opened first."]
    );

    post_rpc(
        app.clone(),
        json!({"id": 2, "owner": "ui-1", "request": "OpenProject", "args": {"project": project}}),
    )
    .await;
    post_rpc(
        app.clone(),
        json!({"id": 3, "owner": "ui-1", "request": "ReadLock", "args": {"object_id": "ap1_child"}}),
    )
    .await;

    let response = post_rpc(
        app.clone(),
        json!({"id": 4, "owner": "ui-2", "request": "IsReadLocked", "args": {"object_id": "ap1_child", "owner": "ui-1"}}),
    )
    .await;
    assert!(response.result);
    assert_eq!(response.data, Some(json!(true)));

    let response = post_rpc(
        app.clone(),
        json!({"id": 5, "owner": "ui-2", "request": "IsReadLocked", "args": {"object_id": "ap1_child", "owner": "ui-2"}}),
    )
    .await;
    assert_eq!(response.data, Some(json!(false)));

    let response = post_rpc(
        app,
        json!({"id": 6, "owner": "ui-2", "request": "IsReadLocked", "args": {"object_id": "ghost", "owner": "ui-1"}}),
    )
    .await;
    assert!(!response.result);
    assert_eq!(response.messages, vec!["Unknown object: ghost"]);
}
