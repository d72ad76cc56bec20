//! Evura - patient and doctor account portal
//!
//! Signup, login and a session-protected dashboard for two roles,
//! served as HTML pages over HTTP.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod template;
pub mod web;

pub use auth::{
    hash_password, login, password_matches, signup, verify_password, AuthError, PasswordError,
    SessionError, SessionManager,
};
pub use config::Config;
pub use db::{Account, AccountRepository, Database, NewAccount, Role};
pub use error::{EvuraError, Result};
pub use web::{create_router, AppState, WebServer};
