//! End-to-end tests against the full router and an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use keystone_db::{Database, DbConfig};
use keystone_server::{build_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    build_router(AppState::new(db, ServerConfig::default()))
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
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
        })),
    )
    .await
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = register(app, "admin").await;
    assert_eq!(status, StatusCode::CREATED);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_first_user_is_admin_and_can_log_in() {
    let app = app().await;
    let (_, first) = register(&app, "alice").await;
    assert_eq!(first["user"]["role"], "admin");
    assert_eq!(first["token_type"], "Bearer");

    let (_, second) = register(&app, "bob").await;
    assert_eq!(second["user"]["role"], "employee");

    let (status, login) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["access_token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_bad_password_is_unauthorized() {
    let app = app().await;
    register(&app, "alice").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = app().await;
    let (status, _) = send(&app, Method::GET, "/api/sales/customers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/sales/customers",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_customer_assigns_code() {
    let app = app().await;
    let token = admin_token(&app).await;

    let (status, customer) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "Acme Corp", "credit_limit": 100000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["customer_code"], "CUST000001");

    let id = customer["id"].as_i64().unwrap();
    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/sales/customers/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["available_credit"], 100000);
}

#[tokio::test]
async fn test_duplicate_department_is_conflict() {
    let app = app().await;
    let token = admin_token(&app).await;
    let body = json!({ "name": "Human Resources" });

    let (status, department) = send(
        &app,
        Method::POST,
        "/api/hr/departments",
        Some(&token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(department["code"], "HUMRES");

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/hr/departments",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error["message"].as_str().unwrap().contains("HUMRES"));
}

#[tokio::test]
async fn test_validation_error_is_unprocessable() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let app = app().await;
    let admin = admin_token(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/users",
        Some(&admin),
        Some(json!({
            "username": "val",
            "email": "val@example.com",
            "password": "password123",
            "role": "viewer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, login) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "val", "password": "password123" })),
    )
    .await;
    let viewer = login["access_token"].as_str().unwrap();

    let (status, _) = send(&app, Method::GET, "/api/sales/customers", Some(viewer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(viewer),
        Some(json!({ "name": "Acme Corp" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_soft_delete_hides_row_and_restore_brings_it_back() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (_, customer) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "Acme Corp" })),
    )
    .await;
    let id = customer["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/records/customers/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, page) = send(&app, Method::GET, "/api/sales/customers", Some(&token), None).await;
    assert_eq!(page["total"], 0);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/records/customers/{}/restore", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, trail) = send(
        &app,
        Method::GET,
        &format!("/api/records/customers/{}/audit", id),
        Some(&token),
        None,
    )
    .await;
    let actions: Vec<_> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["delete", "restore"]);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/records/widgets/1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invoice_totals_through_api() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (_, customer) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "Acme Corp" })),
    )
    .await;

    let (status, invoice) = send(
        &app,
        Method::POST,
        "/api/finance/invoices",
        Some(&token),
        Some(json!({
            "customer_id": customer["id"],
            "invoice_date": "2024-03-01",
            "due_date": "2024-03-31",
            "tax_rate": 1000,
            "items": [
                { "description": "Widget", "quantity": 2, "unit_price": 5000 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", invoice);
    assert_eq!(invoice["invoice_number"], "INV-000001");
    assert_eq!(invoice["subtotal"], 10000);
    assert_eq!(invoice["tax_amount"], 1000);
    assert_eq!(invoice["total"], 11000);

    let id = invoice["id"].as_i64().unwrap();
    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/finance/invoices/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (status, results) = send(
        &app,
        Method::POST,
        "/api/search",
        Some(&token),
        Some(json!({ "query": "invoice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results[0]["title"], "Invoices");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/search",
        Some(&token),
        Some(json!({ "query": "x".repeat(101) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_notifications_start_empty() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (status, feed) = send(&app, Method::GET, "/api/notifications", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["unread_count"], 0);
    assert!(feed["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_counts_users() {
    let app = app().await;
    let token = admin_token(&app).await;
    register(&app, "bob").await;
    register(&app, "carol").await;

    let (status, dashboard) = send(&app, Method::GET, "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["stats"]["total_users"], 3);
    assert_eq!(dashboard["stats"]["active_users"], 3);
    assert_eq!(dashboard["stats"]["admin_users"], 1);
    assert_eq!(dashboard["stats"]["inactive_users"], 0);

    let activities = dashboard["recent_activities"].as_array().unwrap();
    assert_eq!(activities.len(), 3);
    assert_eq!(activities[0]["description"], "New user registered: carol");
    assert_eq!(activities[0]["importance"], "normal");
    assert_eq!(activities[2]["importance"], "important");
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (status, page) = send(
        &app,
        Method::GET,
        &format!("/api/sales/customers?page={}", i64::MAX),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (_, customer) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "Acme Corp" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/finance/invoices",
        Some(&token),
        Some(json!({
            "customer_id": customer["id"],
            "invoice_date": "2024-03-01",
            "due_date": "2024-03-31",
            "items": [
                { "description": "Widget", "quantity": 2, "unit_price": i64::MAX / 2 + 1 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_invoice_status_cannot_be_set_to_paid() {
    let app = app().await;
    let token = admin_token(&app).await;
    let (_, customer) = send(
        &app,
        Method::POST,
        "/api/sales/customers",
        Some(&token),
        Some(json!({ "name": "Acme Corp" })),
    )
    .await;
    let (_, invoice) = send(
        &app,
        Method::POST,
        "/api/finance/invoices",
        Some(&token),
        Some(json!({
            "customer_id": customer["id"],
            "invoice_date": "2024-03-01",
            "due_date": "2024-03-31",
            "items": [
                { "description": "Widget", "quantity": 1, "unit_price": 5000 },
            ],
        })),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/finance/invoices/{}", invoice["id"]),
        Some(&token),
        Some(json!({ "status": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
