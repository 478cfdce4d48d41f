use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use talos_audit_core::canonicalize::hash_canonical;
use talos_audit_core::models::hash_to_hex;
use talos_audit_core::AuditService;
use talos_audit_http::{router, AppState};
use talos_audit_store_memory::InMemoryStore;
use tower::ServiceExt;

async fn test_state() -> AppState {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(AuditService::new(store, None).await.unwrap());
    AppState { service, version: "test", git_sha: "deadbeef", default_list_limit: 50 }
}

fn sample_event_json(id: &str) -> Value {
    let mut body = json!({
        "schema_id": "talos.audit_event",
        "schema_version": "v1",
        "event_id": id,
        "ts": "2026-01-01T00:00:00Z",
        "request_id": "r1",
        "surface_id": "s1",
        "outcome": "success",
        "principal": {},
        "http": {},
        "meta": {},
    });
    let hash = hash_to_hex(&hash_canonical(&body));
    body["event_hash"] = json!(hash);
    body
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_then_root_and_proof() {
    let app = router(test_state().await);
    let event = sample_event_json("e1");

    let ingest_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ingest_response.status(), StatusCode::OK);

    let root_response = app
        .clone()
        .oneshot(Request::builder().uri("/root").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(root_response.status(), StatusCode::OK);
    let bytes = root_response.into_body().collect().await.unwrap().to_bytes();
    let root_body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(root_body["root"], event["event_hash"]);

    let proof_response = app
        .oneshot(Request::builder().uri("/proof/e1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(proof_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_ingest_returns_conflict() {
    let app = router(test_state().await);
    let event = sample_event_json("e1");

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_hash_returns_400() {
    let app = router(test_state().await);
    let mut event = sample_event_json("e1");
    event["event_hash"] = json!("0".repeat(64));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn proof_for_unknown_event_is_404() {
    let app = router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/proof/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_events_response_uses_items_key() {
    let app = router(test_state().await);

    for id in ["e1", "e2"] {
        let event = sample_event_json(id);
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/events")
                    .header("content-type", "application/json")
                    .body(Body::from(event.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::builder().uri("/api/events?limit=1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert!(body.get("events").is_none());
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["event_id"], "e2");
    assert_eq!(body["has_more"], true);
    assert!(body["next_cursor"].is_string());
}
