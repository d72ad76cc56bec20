//! Web UI for Evura.
//!
//! Server-rendered pages for patient and doctor signup, login, the
//! dashboard and logout. Browser state lives in three cookies: the signed
//! session, the CSRF token and pending flash messages.

pub mod csrf;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::PageError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
