//! Account model for Evura.
//!
//! Patients and doctors share one entity; the [`Role`] tag scopes each
//! account and its email uniqueness.

use std::fmt;
use std::str::FromStr;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A patient.
    Patient,
    /// A doctor.
    Doctor,
}

impl Role {
    /// Convert role to database/form string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    /// Get the display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID.
    pub id: i64,
    /// Role this account belongs to.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Display username (not unique).
    pub username: String,
    /// Email address (unique per role).
    pub email: String,
    /// Password hash (Argon2 PHC string).
    pub password: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last successful login.
    pub last_login: Option<String>,
}

/// Data for creating a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub username: String,
    pub email: String,
    /// Password hash; never plaintext.
    pub password: String,
}

impl NewAccount {
    /// Create a new account record. `password_hash` must already be hashed.
    pub fn new(
        role: Role,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            role,
            username: username.into(),
            email: email.into(),
            password: password_hash.into(),
        }
    }
}
