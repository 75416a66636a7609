// contract-desk-server/tests/http_api.rs
// ============================================================================
// Module: HTTP API Tests
// Description: End-to-end tests for the `/api/v1` router.
// Purpose: Validate authentication, status mapping, lifecycle, and audit logging.
// Dependencies: contract-desk-server, contract-desk-config, tower, http-body-util
// ============================================================================

//! ## Overview
//! Drives the router in-process with `tower::ServiceExt::oneshot`; no socket
//! is bound. Each test builds a fresh server over the in-memory store with a
//! known bootstrap admin token.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::net::SocketAddr;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::USER_AGENT;
use contract_desk_config::DeskConfig;
use contract_desk_server::DeskServer;
use contract_desk_server::ServerError;
use http_body_util::BodyExt;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "cd_admin_token_for_tests";

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn config(server_lines: &str, audit_lines: &str, tail: &str) -> DeskConfig {
    let toml = format!(
        "[server]\n{server_lines}\n[server.audit]\n{audit_lines}\n[server.bootstrap_admin]\nemail \
         = \"admin@example.com\"\ntoken = \"{ADMIN_TOKEN}\"\n{tail}"
    );
    DeskConfig::from_bytes(toml.as_bytes()).unwrap()
}

fn app() -> Router {
    DeskServer::from_config(config("", "enabled = false", "")).unwrap().router()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_user(app: &Router, email: &str, role: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/users",
        Some(ADMIN_TOKEN),
        Some(json!({"email": email, "full_name": "Test User", "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["id"].as_i64().unwrap(), body["api_token"].as_str().unwrap().to_string())
}

async fn create_contract(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/contracts",
        Some(token),
        Some(json!({"title": title, "content": "Terms", "counterparty_name": "Landlord"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn set_status(app: &Router, token: &str, id: i64, status: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/v1/contracts/{id}/status"),
        Some(token),
        Some(json!({"status": status})),
    )
    .await
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

#[tokio::test]
async fn root_and_health_need_no_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api"], "/api/v1");
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn api_requires_valid_bearer_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthenticated");

    let (status, _) =
        send(&app, Method::GET, "/api/v1/users/me", Some("cd_not_a_real_token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(AUTHORIZATION, format!("Basic {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/api/v1/users/me", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["email"], "admin@example.com");
}

#[tokio::test]
async fn user_views_never_expose_token_fingerprints() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(ADMIN_TOKEN),
        Some(json!({"email": "p@example.com", "full_name": "Pat", "role": "procurement"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["api_token"].as_str().unwrap().starts_with("cd_"));
    assert!(body.get("token_fingerprint").is_none());

    let (_, users) = send(&app, Method::GET, "/api/v1/users", Some(ADMIN_TOKEN), None).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|user| user.get("token_fingerprint").is_none()));
    assert!(users.iter().all(|user| user.get("api_token").is_none()));
}

#[tokio::test]
async fn rotated_and_deactivated_tokens_stop_working() {
    let app = app();
    let (id, token) = create_user(&app, "p@example.com", "procurement").await;

    let (status, body) =
        send(&app, Method::POST, &format!("/api/v1/users/{id}/token"), Some(ADMIN_TOKEN), None)
            .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["api_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, token);
    let (status, _) = send(&app, Method::GET, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/api/v1/users/me", Some(&rotated), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(ADMIN_TOKEN),
        Some(json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/api/v1/users/me", Some(&rotated), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// SECTION: Access Policy
// ============================================================================

#[tokio::test]
async fn non_admins_cannot_list_users_or_raise_their_role() {
    let app = app();
    let (id, token) = create_user(&app, "p@example.com", "procurement").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "permission_denied");
    assert_eq!(body["error"]["reason"], "list_all_admin_only");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({"full_name": "Pat Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Pat Renamed");
    assert_eq!(body["role"], "procurement");
}

#[tokio::test]
async fn capabilities_reflect_role() {
    let app = app();
    let (_, token) = create_user(&app, "p@example.com", "procurement").await;
    let (status, body) =
        send(&app, Method::GET, "/api/v1/users/me/capabilities", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "procurement");
    let template = body["capabilities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["kind"] == "template")
        .unwrap();
    assert_eq!(template["actions"], json!(["read"]));

    let (_, body) =
        send(&app, Method::GET, "/api/v1/users/me/capabilities", Some(ADMIN_TOKEN), None).await;
    assert!(
        body["capabilities"]
            .as_array()
            .unwrap()
            .iter()
            .all(|entry| entry["actions"].as_array().unwrap().len() == 5)
    );
}

#[tokio::test]
async fn template_writes_require_legal() {
    let app = app();
    let (_, procurement) = create_user(&app, "p@example.com", "procurement").await;
    let (_, legal) = create_user(&app, "l@example.com", "legal").await;
    let template = json!({"name": "NDA", "content": "Mutual NDA", "category": "nda"});

    let (status, body) =
        send(&app, Method::POST, "/api/v1/templates", Some(&procurement), Some(template.clone()))
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "template_write_requires_legal");

    let (status, body) =
        send(&app, Method::POST, "/api/v1/templates", Some(&legal), Some(template)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, body) =
        send(&app, Method::GET, "/api/v1/templates?category=nda", Some(&procurement), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) =
        send(&app, Method::DELETE, &format!("/api/v1/templates/{id}"), Some(&legal), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) =
        send(&app, Method::GET, &format!("/api/v1/templates/{id}"), Some(&procurement), None)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contracts_are_owner_scoped() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let (_, other) = create_user(&app, "f@example.com", "finance").await;
    let id = create_contract(&app, &owner, "Lease").await;
    create_contract(&app, &other, "Audit").await;

    let (status, body) =
        send(&app, Method::GET, &format!("/api/v1/contracts/{id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "owner_mismatch");

    let (status, _) =
        send(&app, Method::GET, "/api/v1/contracts/999", Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = send(&app, Method::GET, "/api/v1/contracts", Some(&owner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["title"], "Lease");

    let (_, all) = send(&app, Method::GET, "/api/v1/contracts", Some(ADMIN_TOKEN), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) =
        send(&app, Method::DELETE, &format!("/api/v1/contracts/{id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) =
        send(&app, Method::DELETE, &format!("/api/v1/contracts/{id}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[tokio::test]
async fn lifecycle_transitions_map_to_http_statuses() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let id = create_contract(&app, &owner, "Lease").await;

    let (_, body) =
        send(&app, Method::GET, &format!("/api/v1/contracts/{id}"), Some(&owner), None).await;
    assert_eq!(body["status"], "draft");
    assert!(body["contract_number"].as_str().unwrap().starts_with("CT-"));

    let (_, body) =
        send(&app, Method::GET, &format!("/api/v1/contracts/{id}/transitions"), Some(&owner), None)
            .await;
    assert_eq!(body["status"], "draft");
    assert_eq!(body["allowed"], json!(["pending_review"]));

    let (status, body) = set_status(&app, &owner, id, "active").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_transition");

    let (status, _) = set_status(&app, &owner, id, "pending_review").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = set_status(&app, &owner, id, "under_review").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = set_status(&app, &owner, id, "approved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "role_not_authorized");

    let (status, body) = set_status(&app, ADMIN_TOKEN, id, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = set_status(&app, ADMIN_TOKEN, id, "approved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "no_change");

    let (_, versions) =
        send(&app, Method::GET, &format!("/api/v1/contracts/{id}/versions"), Some(&owner), None)
            .await;
    let versions = versions.as_array().unwrap();
    assert_eq!(versions.len(), 4);
    assert_eq!(versions[0]["version_number"], 4);
    assert_eq!(versions[0]["status"], "approved");
}

#[tokio::test]
async fn versions_compare_and_restore() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let id = create_contract(&app, &owner, "Lease").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/contracts/{id}"),
        Some(&owner),
        Some(json!({"title": "Lease v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Lease v2");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/contracts/{id}/versions/1/compare/2"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fields: Vec<&str> = body["differences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|change| change["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title"]);

    set_status(&app, &owner, id, "pending_review").await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/contracts/{id}/versions/1/restore"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Lease");
    assert_eq!(body["status"], "pending_review");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/contracts/{id}/versions/5"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Lease");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/contracts/{id}/versions/9"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

#[tokio::test]
async fn audit_logs_are_scoped() {
    let app = app();
    let (owner_id, owner) = create_user(&app, "p@example.com", "procurement").await;
    let (other_id, _) = create_user(&app, "f@example.com", "finance").await;
    let id = create_contract(&app, &owner, "Lease").await;
    set_status(&app, &owner, id, "pending_review").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/audit/logs", Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "list_all_admin_only");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/audit/logs?resource_type=contract&action=status_change",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/audit/logs/contract/{id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> =
        body.as_array().unwrap().iter().map(|entry| entry["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["status_change", "create"]);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/audit/logs/user/{owner_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/audit/logs/user/{other_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn audit_logs_show_client_address_and_agent() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/contracts")
        .header(AUTHORIZATION, format!("Bearer {owner}"))
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, "desk-client/3.2")
        .body(Body::from(
            json!({"title": "Lease", "content": "Terms", "counterparty_name": "Landlord"})
                .to_string(),
        ))
        .unwrap();
    let peer: SocketAddr = "198.51.100.23:41000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/audit/logs?resource_type=contract",
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entry = &body.as_array().unwrap()[0];
    assert_eq!(entry["action"], "create");
    assert_eq!(entry["ip_address"], "198.51.100.23");
    assert_eq!(entry["user_agent"], "desk-client/3.2");
}

#[tokio::test]
async fn put_repeating_status_updates_content() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let id = create_contract(&app, &owner, "Lease").await;
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/contracts/{id}"),
        Some(&owner),
        Some(json!({"title": "Lease v2", "status": "draft"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["title"], "Lease v2");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["revision"], 2);

    let (status, body) = set_status(&app, &owner, id, "draft").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "no_change");
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = app();
    let (_, owner) = create_user(&app, "p@example.com", "procurement").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/contracts",
        Some(&owner),
        Some(json!({
            "title": "Lease",
            "content": "Terms",
            "counterparty_name": "Landlord",
            "status": "active",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = create_contract(&app, &owner, "Lease").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/contracts/{id}"),
        Some(&owner),
        Some(json!({"owner_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paging_is_clamped_by_config() {
    let server = DeskServer::from_config(config(
        "",
        "enabled = false",
        "[paging]\ndefault_limit = 2\nmax_limit = 3\n",
    ))
    .unwrap();
    let app = server.router();
    for title in ["A", "B", "C", "D"] {
        create_contract(&app, ADMIN_TOKEN, title).await;
    }
    let (_, body) = send(&app, Method::GET, "/api/v1/contracts", Some(ADMIN_TOKEN), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) =
        send(&app, Method::GET, "/api/v1/contracts?limit=50", Some(ADMIN_TOKEN), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    let (_, body) =
        send(&app, Method::GET, "/api/v1/contracts?skip=3&limit=3", Some(ADMIN_TOKEN), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "D");
}

// ============================================================================
// SECTION: Request Handling
// ============================================================================

#[tokio::test]
async fn malformed_and_oversized_bodies_are_rejected() {
    let server =
        DeskServer::from_config(config("max_body_bytes = 256", "enabled = false", "")).unwrap();
    let app = server.router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/contracts")
        .header(AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let oversized = json!({
        "title": "Lease",
        "content": "x".repeat(1024),
        "counterparty_name": "Landlord",
    });
    let (status, _) =
        send(&app, Method::POST, "/api/v1/contracts", Some(ADMIN_TOKEN), Some(oversized)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn file_audit_sink_records_requests_and_denials() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("audit.log");
    let audit = format!("path = \"{}\"", path.display());
    let app = DeskServer::from_config(config("", &audit, "")).unwrap().router();
    let (_, token) = create_user(&app, "p@example.com", "procurement").await;
    send(&app, Method::GET, "/api/v1/users", Some(&token), None).await;

    let events: Vec<Value> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events.iter().any(|event| {
        event["event"] == "security_audit" && event["kind"] == "bootstrap_admin_created"
    }));
    assert!(events.iter().any(|event| {
        event["event"] == "http_request"
            && event["method"] == "POST"
            && event["status"] == 201
            && event["role"] == "admin"
    }));
    assert!(events.iter().any(|event| {
        event["event"] == "access_denied"
            && event["reason"] == "list_all_admin_only"
            && event["path"] == "/api/v1/users"
    }));
    assert!(!fs::read_to_string(&path).unwrap().contains(ADMIN_TOKEN));
}

// ============================================================================
// SECTION: Startup
// ============================================================================

#[test]
fn exposed_server_without_users_fails_closed() {
    let temp = TempDir::new().unwrap();
    let toml = format!(
        "[server]\nbind = \"0.0.0.0:0\"\n[server.audit]\nenabled = false\n[store]\ntype = \
         \"sqlite\"\npath = \"{}\"\n",
        temp.path().join("desk.db").display()
    );
    let config = DeskConfig::from_bytes(toml.as_bytes()).unwrap();
    let Err(err) = DeskServer::from_config(config) else {
        panic!("expected startup failure");
    };
    assert!(matches!(err, ServerError::Init(_)));
    assert!(err.to_string().contains("no users exist"));
}

#[tokio::test]
async fn sqlite_store_survives_restart() {
    let temp = TempDir::new().unwrap();
    let tail = format!("[store]\ntype = \"sqlite\"\npath = \"{}\"\n", temp.path().join("desk.db").display());
    let first = DeskServer::from_config(config("", "enabled = false", &tail)).unwrap().router();
    let (_, token) = create_user(&first, "p@example.com", "procurement").await;
    let id = create_contract(&first, &token, "Lease").await;
    drop(first);

    let second = DeskServer::from_config(config("", "enabled = false", &tail)).unwrap().router();
    let (status, body) =
        send(&second, Method::GET, &format!("/api/v1/contracts/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Lease");
    let (_, users) = send(&second, Method::GET, "/api/v1/users", Some(ADMIN_TOKEN), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}
