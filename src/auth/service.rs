//! Signup and login for Evura.
//!
//! These functions are independent of HTTP: they take validated-shape form
//! data and a role, talk to the store and the hasher, and return the account
//! or an [`AuthError`] the web layer turns into a response.

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::validation::{FieldErrors, LoginForm, SignupForm};
use crate::auth::{hash_password, password_matches, PasswordError};
use crate::db::{Account, AccountRepository, NewAccount, Role};
use crate::{Database, EvuraError};

/// Well-formed Argon2id hash with default parameters that no password
/// matches. Verified against when the email is unknown.
const UNKNOWN_ACCOUNT_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Signup and login failures.
#[derive(Error, Debug)]
pub enum AuthError {
    /// One or more fields failed validation.
    #[error("{0}")]
    Validation(FieldErrors),

    /// The email is already registered for this role.
    #[error("email already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Store failure.
    #[error(transparent)]
    Internal(#[from] EvuraError),
}

/// Register a new account for `role`.
///
/// This function:
/// 1. Validates the signup fields
/// 2. Checks the email is not already registered for the role
/// 3. Hashes the password
/// 4. Creates the account
///
/// A concurrent signup that wins the race between steps 2 and 4 trips the
/// `(role, email)` UNIQUE constraint, which is reported as
/// [`AuthError::DuplicateEmail`] as well.
pub async fn signup(db: &Database, role: Role, form: &SignupForm) -> Result<Account, AuthError> {
    // 1. Validate fields
    form.check().map_err(AuthError::Validation)?;

    let repo = AccountRepository::new(db.pool());

    // 2. Check for an existing account
    if repo.email_exists(role, &form.email).await? {
        debug!(role = %role, email = %form.email, "Signup rejected, email taken");
        return Err(AuthError::DuplicateEmail);
    }

    // 3 + 4. Hash the password and create the account
    let account = create_account(&repo, role, form).await?;

    info!(account_id = account.id, role = %role, "New account registered");

    Ok(account)
}

/// Hash and insert. A `(role, email)` row that appeared since the
/// existence check is reported as [`AuthError::DuplicateEmail`].
async fn create_account(
    repo: &AccountRepository<'_>,
    role: Role,
    form: &SignupForm,
) -> Result<Account, AuthError> {
    let password_hash = hash_password(&form.password)?;
    let new_account = NewAccount::new(role, &form.username, &form.email, password_hash);

    repo.create(&new_account).await.map_err(|e| match e {
        EvuraError::AlreadyExists(_) => AuthError::DuplicateEmail,
        other => AuthError::Internal(other),
    })
}

/// Authenticate an account of `role`.
///
/// Unknown emails and wrong passwords both return
/// [`AuthError::InvalidCredentials`]. On success the account's last login is
/// refreshed.
pub async fn login(db: &Database, role: Role, form: &LoginForm) -> Result<Account, AuthError> {
    form.check().map_err(AuthError::Validation)?;

    let repo = AccountRepository::new(db.pool());

    let account = match repo.get_by_email(role, &form.email).await? {
        Some(account) if password_matches(&form.password, &account.password) => account,
        Some(_) => {
            debug!(role = %role, email = %form.email, "Login rejected, wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        None => {
            // Pay the same Argon2 cost as a real verification
            password_matches(&form.password, UNKNOWN_ACCOUNT_HASH);
            debug!(role = %role, email = %form.email, "Login rejected, unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    repo.update_last_login(account.id).await?;
    info!(account_id = account.id, role = %role, "Account logged in");

    // Reload so the returned account carries the fresh last_login.
    Ok(repo.get_by_id(account.id).await?.unwrap_or(account))
}
