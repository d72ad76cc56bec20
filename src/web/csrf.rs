//! Double-submit CSRF tokens.
//!
//! `GET /` issues a random token in a cookie and echoes it in every form;
//! `POST /` accepts a submission only when both copies match.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "evura_csrf";

/// Token the browser was issued, if it sent one back.
pub fn issued_token(jar: &CookieJar) -> Option<String> {
    jar.get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Return the jar's token, issuing a new one when missing.
pub fn ensure_token(jar: CookieJar, secure: bool) -> (CookieJar, String) {
    if let Some(token) = issued_token(&jar) {
        return (jar, token);
    }

    let token = Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    (jar.add(cookie), token)
}
