//! Page handlers for the web UI.

pub mod dashboard;
pub mod entry;

pub use dashboard::{dashboard, logout};
pub use entry::{index, submit, EntryQuery};

use std::sync::Arc;

use axum::response::Html;

use crate::auth::SessionManager;
use crate::template::{TemplateContext, TemplateEngine};
use crate::web::error::PageError;
use crate::Database;

/// Database shared across handlers. The sqlx pool is internally synchronized.
pub type SharedDatabase = Arc<Database>;

/// Application state shared across handlers.
pub struct AppState {
    /// Identity store.
    pub db: SharedDatabase,
    /// Session cookie issuer and resolver.
    pub sessions: SessionManager,
    /// Parsed page templates.
    pub templates: TemplateEngine,
}

impl AppState {
    /// Create the application state, parsing the built-in pages.
    pub fn new(db: SharedDatabase, sessions: SessionManager) -> crate::Result<Self> {
        Ok(Self {
            db,
            sessions,
            templates: TemplateEngine::with_builtin_pages()?,
        })
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.sessions.secure()
    }

    /// Render a page.
    pub fn render(&self, page: &str, context: &TemplateContext) -> Result<Html<String>, PageError> {
        Ok(Html(self.templates.render(page, context)?))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .finish()
    }
}
