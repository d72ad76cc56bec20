//! Account repository for Evura.
//!
//! Every lookup is scoped by role: the same email may exist once per role.

use super::account::{Account, NewAccount, Role};
use super::DbPool;
use crate::{EvuraError, Result};

const ACCOUNT_COLUMNS: &str = "id, role, username, email, password, created_at, last_login";

/// Repository for account CRUD operations.
pub struct AccountRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new AccountRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    ///
    /// Returns [`EvuraError::AlreadyExists`] if the email is already
    /// registered for the same role.
    pub async fn create(&self, new_account: &NewAccount) -> Result<Account> {
        let result = sqlx::query(
            "INSERT INTO accounts (role, username, email, password) VALUES (?, ?, ?, ?)",
        )
        .bind(new_account.role.as_str())
        .bind(&new_account.username)
        .bind(&new_account.email)
        .bind(&new_account.password)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| EvuraError::NotFound("account".to_string()))
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(account)
    }

    /// Get an account by role and email (exact match).
    pub async fn get_by_email(&self, role: Role, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = ? AND email = ?");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(role.as_str())
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(account)
    }

    /// Check whether an email is registered for the given role.
    pub async fn email_exists(&self, role: Role, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE role = ? AND email = ?)",
        )
        .bind(role.as_str())
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Update the last login timestamp for an account.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE accounts SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Count accounts with the given role.
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
