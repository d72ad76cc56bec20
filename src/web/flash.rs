//! One-shot flash messages carried across a redirect.
//!
//! Pending messages live in a cookie holding a URL-encoded JSON list. The
//! next page that displays them removes the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::template::Value;

/// Name of the flash cookie.
pub const FLASH_COOKIE: &str = "evura_flash";

/// Flash message category, used as the alert style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Warning,
    Danger,
}

impl FlashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Warning => "warning",
            FlashCategory::Danger => "danger",
        }
    }
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Danger,
            message: message.into(),
        }
    }

    /// Template value with `category` and `message` fields.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("category", Value::from(self.category.as_str())),
            ("message", Value::from(self.message.as_str())),
        ])
    }
}

/// Messages waiting in the jar. A cookie that does not decode yields none.
pub fn pending(jar: &CookieJar) -> Vec<Flash> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| urlencoding::decode(cookie.value()).ok())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

/// Queue a message for the next page.
pub fn push(jar: CookieJar, flash: Flash, secure: bool) -> CookieJar {
    let mut flashes = pending(&jar);
    flashes.push(flash);

    match serde_json::to_string(&flashes) {
        Ok(json) => {
            let cookie = Cookie::build((FLASH_COOKIE, urlencoding::encode(&json).into_owned()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(secure);
            jar.add(cookie)
        }
        Err(e) => {
            tracing::warn!("Dropping flash message: {}", e);
            jar
        }
    }
}

/// Take every pending message, removing the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let flashes = pending(&jar);
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, flashes);
    }
    (jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/")), flashes)
}
