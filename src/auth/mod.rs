//! Authentication module for Evura.
//!
//! This module provides password hashing, form validation, signup/login and
//! session management.

mod password;
mod service;
mod session;
pub mod validation;

pub use password::{hash_password, password_matches, verify_password, PasswordError};
pub use service::{login, signup, AuthError};
pub use session::{SessionClaims, SessionError, SessionManager};
pub use validation::{EntryForm, FieldErrors, FormIntent, LoginForm, SignupForm};
