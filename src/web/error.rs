//! Page error handling for the Evura web UI.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::auth::{AuthError, SessionError};
use crate::template::{escape_html, TemplateError};
use crate::EvuraError;

/// An error rendered as an HTML page.
///
/// Internal failures show a generic message; the details only go to the log.
#[derive(Debug)]
pub struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    /// Create a new page error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. Please try again later.",
        )
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Evura - Error</title></head>\n\
             <body>\n<main class=\"container\">\n<h1>{}</h1>\n<p>{}</p>\n<a href=\"/\">Back to start</a>\n</main>\n</body>\n</html>\n",
            self.status.as_u16(),
            escape_html(&self.message)
        )
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.status, Html(self.to_html())).into_response()
    }
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for PageError {}

impl From<EvuraError> for PageError {
    fn from(err: EvuraError) -> Self {
        match &err {
            EvuraError::NotFound(what) => PageError::not_found(format!("{what} not found")),
            _ => {
                tracing::error!("Internal error: {}", err);
                PageError::internal()
            }
        }
    }
}

impl From<SessionError> for PageError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(e) => e.into(),
            other => {
                tracing::error!("Session error: {}", other);
                PageError::internal()
            }
        }
    }
}

impl From<AuthError> for PageError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(e) => e.into(),
            other => {
                tracing::error!("Unhandled auth error: {}", other);
                PageError::internal()
            }
        }
    }
}

impl From<TemplateError> for PageError {
    fn from(err: TemplateError) -> Self {
        tracing::error!("Template error: {}", err);
        PageError::internal()
    }
}
