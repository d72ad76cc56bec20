//! Session repository.
//!
//! A session row is what the signed session cookie points at; revoking the
//! row ends the session even if the browser still holds the cookie.

use super::DbPool;
use crate::{EvuraError, Result};

/// Session row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    /// Row ID.
    pub id: i64,
    /// Opaque session token (UUID v4).
    pub token: String,
    /// Account this session is bound to.
    pub account_id: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None while active).
    pub revoked_at: Option<String>,
}

impl SessionRecord {
    /// Whether the session has not been revoked.
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// New session for creation.
pub struct NewSession {
    /// Token string.
    pub token: String,
    /// Account ID.
    pub account_id: i64,
}

/// Repository for session rows.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new session.
    pub async fn create(&self, new_session: &NewSession) -> Result<SessionRecord> {
        sqlx::query("INSERT INTO sessions (token, account_id) VALUES (?, ?)")
            .bind(&new_session.token)
            .bind(new_session.account_id)
            .execute(self.pool)
            .await?;

        self.get_by_token(&new_session.token)
            .await?
            .ok_or_else(|| EvuraError::NotFound("session".to_string()))
    }

    /// Get a session by token, revoked or not.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, token, account_id, created_at, revoked_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;
        Ok(session)
    }

    /// Get a session by token only if it has not been revoked.
    pub async fn get_active(&self, token: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, token, account_id, created_at, revoked_at
             FROM sessions
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;
        Ok(session)
    }

    /// Revoke a session. Returns false if it was unknown or already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = datetime('now') WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active sessions of an account.
    #[cfg(test)]
    pub async fn count_active_for_account(&self, account_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE account_id = ? AND revoked_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Delete revoked sessions.
    pub async fn cleanup_revoked(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE revoked_at IS NOT NULL")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, NewAccount, Role};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let account = AccountRepository::new(db.pool())
            .create(&NewAccount::new(Role::Patient, "alicealice", "a@x.com", "hash"))
            .await
            .unwrap();
        (db, account.id)
    }

    fn new_session(token: &str, account_id: i64) -> NewSession {
        NewSession {
            token: token.to_string(),
            account_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, account_id) = setup().await;
        let repo = SessionRepository::new(db.pool());

        let created = repo.create(&new_session("tok-1", account_id)).await.unwrap();
        assert_eq!(created.token, "tok-1");
        assert_eq!(created.account_id, account_id);
        assert!(created.is_active());

        let found = repo.get_active("tok-1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_active("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_requires_existing_account() {
        let (db, _) = setup().await;
        let repo = SessionRepository::new(db.pool());

        assert!(repo.create(&new_session("tok", 999)).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke() {
        let (db, account_id) = setup().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("tok-1", account_id)).await.unwrap();

        assert!(repo.revoke("tok-1").await.unwrap());
        assert!(repo.get_active("tok-1").await.unwrap().is_none());

        let revoked = repo.get_by_token("tok-1").await.unwrap().unwrap();
        assert!(!revoked.is_active());

        // Second revoke is a no-op
        assert!(!repo.revoke("tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_active_for_account() {
        let (db, account_id) = setup().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("tok-1", account_id)).await.unwrap();
        repo.create(&new_session("tok-2", account_id)).await.unwrap();
        assert_eq!(repo.count_active_for_account(account_id).await.unwrap(), 2);

        repo.revoke("tok-2").await.unwrap();
        assert_eq!(repo.count_active_for_account(account_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_revoked() {
        let (db, account_id) = setup().await;
        let repo = SessionRepository::new(db.pool());

        repo.create(&new_session("tok-1", account_id)).await.unwrap();
        repo.create(&new_session("tok-2", account_id)).await.unwrap();
        repo.revoke("tok-1").await.unwrap();

        assert_eq!(repo.cleanup_revoked().await.unwrap(), 1);
        assert!(repo.get_by_token("tok-1").await.unwrap().is_none());
        assert!(repo.get_active("tok-2").await.unwrap().is_some());
    }
}
