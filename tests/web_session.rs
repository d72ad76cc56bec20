//! Session Tests
//!
//! Integration tests for the dashboard guard, logout and session cookies.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{TestBrowser, SESSION_COOKIE, TEST_SECRET};
use evura::auth::SessionManager;
use evura::web::handlers::AppState;
use evura::web::router::create_router;
use evura::{Database, Role};
use std::sync::Arc;

/// Create an axum-test server with an in-memory database.
async fn create_test_server() -> TestServer {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let sessions = SessionManager::new(TEST_SECRET, SESSION_COOKIE, false);
    let state = AppState::new(Arc::new(db), sessions).expect("Failed to create app state");

    TestServer::new(create_router(Arc::new(state))).expect("Failed to create test server")
}

// ============================================================================
// Dashboard Guard Tests
// ============================================================================

#[tokio::test]
async fn test_dashboard_without_session() {
    let mut browser = TestBrowser::new().await;

    let page = browser.get("/dashboard").await;

    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));
}

#[tokio::test]
async fn test_dashboard_with_tampered_cookie() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Patient, "alice_01", "alice@example.com", "password123")
        .await;

    let mut cookie = browser.cookie(SESSION_COOKIE).unwrap().to_string();
    cookie.push('x');
    browser.set_cookie(SESSION_COOKIE, &cookie);

    let page = browser.get("/dashboard").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));
}

#[tokio::test]
async fn test_dashboard_shows_own_account() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Doctor, "drhouse", "house@example.com", "vicodin42")
        .await;

    let page = browser.get("/dashboard").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Hello, drhouse"));
    assert!(page.body.contains("house@example.com"));
    assert!(page.body.contains("<dd>Doctor</dd>"));
    assert!(!page.body.contains("$argon2"));
}

#[tokio::test]
async fn test_flash_shown_once() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Patient, "alice_01", "alice@example.com", "password123")
        .await;

    let first = browser.get("/dashboard").await;
    assert!(first.body.contains("Account created successfully"));

    let second = browser.get("/dashboard").await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(!second.body.contains("Account created successfully"));
}

// ============================================================================
// Logout Tests
// ============================================================================

#[tokio::test]
async fn test_logout() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Patient, "alice_01", "alice@example.com", "password123")
        .await;

    let page = browser.get("/logout").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));
    assert!(browser.cookie(SESSION_COOKIE).is_none());

    let dashboard = browser.get("/dashboard").await;
    assert_eq!(dashboard.status, StatusCode::SEE_OTHER);
    assert_eq!(dashboard.location(), Some("/"));
}

#[tokio::test]
async fn test_logout_revokes_copied_cookie() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Patient, "alice_01", "alice@example.com", "password123")
        .await;
    let stolen = browser.cookie(SESSION_COOKIE).unwrap().to_string();

    browser.get("/logout").await;

    let mut replay = browser.fresh_browser();
    replay.set_cookie(SESSION_COOKIE, &stolen);
    let page = replay.get("/dashboard").await;

    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));
}

#[tokio::test]
async fn test_logout_without_session() {
    let mut browser = TestBrowser::new().await;

    let page = browser.get("/logout").await;

    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));
}

#[tokio::test]
async fn test_login_replaces_previous_session() {
    let mut browser = TestBrowser::new().await;
    browser
        .signup(Role::Patient, "alice_01", "alice@example.com", "password123")
        .await;
    let patient_cookie = browser.cookie(SESSION_COOKIE).unwrap().to_string();

    browser
        .signup(Role::Doctor, "dr_alice", "dr.alice@example.com", "password123")
        .await;

    let page = browser.get("/dashboard").await;
    assert!(page.body.contains("Hello, dr_alice"));

    let mut replay = browser.fresh_browser();
    replay.set_cookie(SESSION_COOKIE, &patient_cookie);
    let page = replay.get("/dashboard").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
}

// ============================================================================
// Response Header Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_security_headers_on_pages() {
    let server = create_test_server().await;

    let response = server.get("/").await;

    response.assert_status_ok();
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("cache-control"), "no-store, max-age=0");
}

#[tokio::test]
async fn test_cookies_are_http_only() {
    let server = create_test_server().await;

    let response = server.get("/").await;

    let set_cookie = response.header("set-cookie");
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.starts_with("evura_csrf="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Secure"));
}
