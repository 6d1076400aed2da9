//! Route-level tests through `tower::ServiceExt::oneshot`, plus one live
//! socket round trip.

use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use workflow_server::{ServerConfig, WorkflowServer};
use workflow_store::TaskStore;

struct Harness {
    _tmp: tempfile::TempDir,
    server: WorkflowServer,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let server = WorkflowServer::new(ServerConfig::default(), TaskStore::open(tmp.path()));
        Self { _tmp: tmp, server }
    }

    fn app(&self) -> Router {
        self.server.router()
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = self.app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, title: &str) -> String {
        let (status, body) = self
            .call(Method::POST, "/api/tasks", Some(json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn listed_ids(&self) -> Vec<String> {
        let (_, body) = self.call(Method::GET, "/api/tasks", None).await;
        body["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let (status, body) = h.call(Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn create_generates_id_and_lists_newest_first() {
    let h = Harness::new();
    let first = h.create("Implementar PostRepository").await;
    let second = h.create("Add search endpoint").await;
    assert!(first.ends_with("-implementar-postrepository"));
    assert_eq!(first.len(), "YYMMDD-implementar-postrepository".len());
    assert_eq!(h.listed_ids().await, vec![second, first]);
}

#[tokio::test]
async fn create_without_title_is_rejected() {
    let h = Harness::new();
    let (status, body) = h
        .call(Method::POST, "/api/tasks", Some(json!({ "category": "api" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title is required");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let resp = h.app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_update_complete_delete() {
    let h = Harness::new();
    let id = h.create("Write docs").await;
    let uri = format!("/api/tasks/{id}");

    let (status, body) = h.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Write docs");
    assert_eq!(body["status"], "backlog");

    let (status, body) = h
        .call(Method::PUT, &uri, Some(json!({ "status": "active", "owner": "sam" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["phase"], "plan");
    assert_eq!(body["owner"], "sam");
    assert!(body["started_at"].is_string());

    let (status, body) = h
        .call(Method::POST, &format!("{uri}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["completed_at"].is_string());

    let (status, body) = h.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = h.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn missing_tasks_are_404_everywhere() {
    let h = Harness::new();
    let cases = [
        (Method::GET, "/api/tasks/nope", None),
        (Method::PUT, "/api/tasks/nope", Some(json!({ "title": "x" }))),
        (Method::POST, "/api/tasks/nope/complete", None),
        (Method::DELETE, "/api/tasks/nope", None),
        (Method::PUT, "/api/tasks/nope/reorder", Some(json!({ "position": 0 }))),
        (Method::PUT, "/api/tasks/nope/reorder-between", Some(json!({}))),
    ];
    for (method, uri, body) in cases {
        let (status, _) = h.call(method.clone(), uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn invalid_update_is_a_bad_request() {
    let h = Harness::new();
    let id = h.create("Write docs").await;
    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{id}"),
            Some(json!({ "status": "paused" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reorder_by_position() {
    let h = Harness::new();
    let a = h.create("Task alpha").await;
    let b = h.create("Task beta").await;
    let c = h.create("Task gamma").await;
    assert_eq!(h.listed_ids().await, vec![c.clone(), b.clone(), a.clone()]);

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{a}/reorder"),
            Some(json!({ "position": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], a.as_str());
    assert_eq!(h.listed_ids().await, vec![a.clone(), c.clone(), b.clone()]);

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{a}/reorder"),
            Some(json!({ "position": "first" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Position must be a number");
}

#[tokio::test]
async fn reorder_between_neighbors() {
    let h = Harness::new();
    let a = h.create("Task alpha").await;
    let b = h.create("Task beta").await;
    let c = h.create("Task gamma").await;

    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{c}/reorder-between"),
            Some(json!({ "beforeTaskId": b, "afterTaskId": a })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.listed_ids().await, vec![b.clone(), c.clone(), a.clone()]);

    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{a}/reorder-between"),
            Some(json!({ "afterTaskId": b })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.listed_ids().await, vec![a.clone(), b.clone(), c.clone()]);

    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{a}/reorder-between"),
            Some(json!({ "beforeTaskId": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_query() {
    let h = Harness::new();
    let a = h.create("Task alpha").await;
    let _b = h.create("Task beta").await;
    let _ = h
        .call(Method::POST, &format!("/api/tasks/{a}/complete"), None)
        .await;

    let (status, body) = h
        .call(Method::GET, "/api/tasks?status=completed", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], a.as_str());

    let (status, _) = h.call(Method::GET, "/api/tasks?status=paused", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_overview_and_meta() {
    let h = Harness::new();
    let a = h.create("Task alpha").await;
    let _ = h.create("Task beta").await;
    let _ = h
        .call(
            Method::PUT,
            &format!("/api/tasks/{a}"),
            Some(json!({ "status": "active", "category": "api" })),
        )
        .await;

    let (status, body) = h
        .call(Method::PUT, "/api/project/meta", Some(json!({ "focus": "Ship v1" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["focus"], "Ship v1");

    let (status, body) = h.call(Method::GET, "/api/project", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["projectPath"].is_string());
    assert_eq!(body["meta"]["focus"], "Ship v1");
    assert_eq!(body["stats"]["total"], 2);
    assert_eq!(body["stats"]["active"], 1);
    assert_eq!(body["stats"]["backlog"], 1);
    assert_eq!(body["stats"]["byStatus"]["active"], 1);
    assert_eq!(body["stats"]["byCategory"]["api"], 1);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let h = Harness::new();
    let (status, _) = h.call(Method::GET, "/api/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn events_stream_is_sse() {
    let h = Harness::new();
    let req = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    let resp = h.app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn events_stream_ends_on_shutdown() {
    let h = Harness::new();
    let req = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    let resp = h.app().oneshot(req).await.unwrap();
    h.server.shutdown().token().cancel();

    let body = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(resp.into_body(), 100_000),
    )
    .await
    .expect("stream closes after cancel")
    .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("\"type\":\"connected\""));
}

#[tokio::test]
async fn drain_is_not_held_up_by_open_event_streams() {
    let h = Harness::new();
    let (addr, handle) = h.server.listen().await.unwrap();
    let resp = reqwest::get(format!("http://{addr}/api/events"))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let started = Instant::now();
    assert!(h.server.shutdown().drain(handle).await);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(resp.text().await.unwrap().contains("connected"));
}

#[tokio::test]
async fn live_server_round_trip() {
    let h = Harness::new();
    let (addr, handle) = h.server.listen().await.unwrap();
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let created: Value = client
        .post(format!("{base}/api/tasks"))
        .json(&json!({ "title": "Live task" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(created["id"].as_str().unwrap().ends_with("-live-task"));

    let resp = client
        .get(format!("{base}/api/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let listed: Value = resp.json().await.unwrap();
    assert_eq!(listed["tasks"].as_array().unwrap().len(), 1);

    assert!(h.server.shutdown().drain(handle).await);
}
