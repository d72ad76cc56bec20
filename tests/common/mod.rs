//! Test helpers for page-level tests.
//!
//! Provides a cookie-keeping TestBrowser that drives the router in-process.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use evura::auth::SessionManager;
use evura::web::handlers::AppState;
use evura::web::router::create_router;
use evura::{AccountRepository, Database, Role};

/// Secret used to sign session cookies in tests.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// Name of the session cookie in tests.
pub const SESSION_COOKIE: &str = "evura_session";

/// A response as the browser sees it.
pub struct Page {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Page {
    /// Redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// A browser holding cookies between requests.
pub struct TestBrowser {
    router: Router,
    db: Arc<Database>,
    cookies: BTreeMap<String, String>,
}

impl TestBrowser {
    /// Create an application over a fresh in-memory database.
    pub async fn new() -> Self {
        let db = Arc::new(
            Database::open_in_memory()
                .await
                .expect("Failed to create test database"),
        );
        let sessions = SessionManager::new(TEST_SECRET, SESSION_COOKIE, false);
        let state = AppState::new(db.clone(), sessions).expect("Failed to create app state");

        Self {
            router: create_router(Arc::new(state)),
            db,
            cookies: BTreeMap::new(),
        }
    }

    /// A second browser against the same application, without cookies.
    pub fn fresh_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            db: self.db.clone(),
            cookies: BTreeMap::new(),
        }
    }

    /// The application database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Current value of a cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Overwrite a cookie.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Issue a GET request.
    pub async fn get(&mut self, uri: &str) -> Page {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Submit a urlencoded form.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Page {
        let body = fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&mut self, mut request: Request<Body>) -> Page {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, cookie_header.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        for value in headers.get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            let expired = raw.to_ascii_lowercase().contains("max-age=0");

            if expired || value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        Page {
            status,
            headers,
            body,
        }
    }

    /// Load the entry page and return the CSRF token embedded in its forms.
    pub async fn csrf_token(&mut self) -> String {
        let page = self.get("/").await;
        extract_csrf(&page.body).expect("entry page has no CSRF token")
    }

    /// Sign up through the entry page.
    pub async fn signup(&mut self, role: Role, username: &str, email: &str, password: &str) -> Page {
        let token = self.csrf_token().await;
        self.post_form(
            "/",
            &[
                ("form_name", "signup"),
                ("role", role.as_str()),
                ("username", username),
                ("email", email),
                ("password", password),
                ("csrf_token", &token),
            ],
        )
        .await
    }

    /// Log in through the entry page.
    pub async fn login(&mut self, role: Role, email: &str, password: &str) -> Page {
        let token = self.csrf_token().await;
        self.post_form(
            "/",
            &[
                ("form_name", "login"),
                ("role", role.as_str()),
                ("email", email),
                ("password", password),
                ("csrf_token", &token),
            ],
        )
        .await
    }

    /// Number of accounts registered under `role`.
    pub async fn account_count(&self, role: Role) -> i64 {
        AccountRepository::new(self.db.pool())
            .count_by_role(role)
            .await
            .unwrap()
    }
}

/// Extract the CSRF token from a rendered entry page.
pub fn extract_csrf(html: &str) -> Option<String> {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}
