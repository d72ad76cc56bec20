//! Middleware for the web UI.

pub mod auth;
pub mod security;

pub use auth::CurrentAccount;
pub use security::security_headers;
