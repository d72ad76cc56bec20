//! Session management for Evura.
//!
//! A session is a row in the `sessions` table plus a signed cookie that
//! references it. The cookie is an HS256 JWT carrying [`SessionClaims`]; the
//! row is what makes logout final, since a revoked row no longer resolves even
//! if the browser replays an old cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::db::{Account, AccountRepository, NewSession, SessionRepository};
use crate::{Database, EvuraError};

/// Session-related errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session cookie could not be signed.
    #[error("session encoding failed: {0}")]
    Encoding(String),

    /// Session store failure.
    #[error(transparent)]
    Store(#[from] EvuraError),
}

/// Claims carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session token (the `sessions.token` column).
    pub sid: String,
    /// Account ID.
    pub sub: i64,
    /// Account role.
    pub role: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
}

/// Issues, resolves and destroys browser sessions.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    secure: bool,
}

impl SessionManager {
    /// Create a session manager signing with `secret`.
    pub fn new(secret: &str, cookie_name: impl Into<String>, secure: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Sessions end on logout, not on a clock.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_name: cookie_name.into(),
            secure,
        }
    }

    /// Create a session manager from the `[session]` config section.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret_key, config.cookie_name.clone(), config.secure_cookie)
    }

    /// Name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Whether cookies are marked `Secure`.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Sign claims into a cookie value.
    pub fn encode_claims(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| SessionError::Encoding(e.to_string()))
    }

    /// Verify a cookie value. Returns `None` for anything not signed by us.
    pub fn decode_claims(&self, value: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(value, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Session cookie rejected: {}", e);
                None
            }
        }
    }

    /// Bind `account` to the browser session.
    ///
    /// Any session the jar already references is revoked first, so a browser
    /// holds at most one live identity.
    pub async fn establish(
        &self,
        db: &Database,
        jar: CookieJar,
        account: &Account,
    ) -> Result<CookieJar, SessionError> {
        let sessions = SessionRepository::new(db.pool());

        if let Some(previous) = self.claims_from(&jar) {
            sessions.revoke(&previous.sid).await?;
        }

        let token = Uuid::new_v4().to_string();
        sessions
            .create(&NewSession {
                token: token.clone(),
                account_id: account.id,
            })
            .await?;

        let claims = SessionClaims {
            sid: token,
            sub: account.id,
            role: account.role.as_str().to_string(),
            iat: chrono::Utc::now().timestamp(),
        };
        let value = self.encode_claims(&claims)?;

        info!(account_id = account.id, role = %account.role, "Session established");
        Ok(jar.add(self.session_cookie(value)))
    }

    /// Resolve the account bound to the browser session, if any.
    ///
    /// The cookie must verify, its session row must still be active, and the
    /// row's account and role must match the claims.
    pub async fn resolve_current(
        &self,
        db: &Database,
        jar: &CookieJar,
    ) -> Result<Option<Account>, SessionError> {
        let Some(claims) = self.claims_from(jar) else {
            return Ok(None);
        };

        let session = SessionRepository::new(db.pool())
            .get_active(&claims.sid)
            .await?;
        let Some(session) = session else {
            debug!("Session {} is unknown or revoked", claims.sid);
            return Ok(None);
        };
        if session.account_id != claims.sub {
            return Ok(None);
        }

        let account = AccountRepository::new(db.pool())
            .get_by_id(claims.sub)
            .await?;
        Ok(account.filter(|a| a.role.as_str() == claims.role))
    }

    /// Revoke the session the jar references and remove the cookie.
    pub async fn destroy(&self, db: &Database, jar: CookieJar) -> Result<CookieJar, SessionError> {
        if let Some(claims) = self.claims_from(&jar) {
            if SessionRepository::new(db.pool()).revoke(&claims.sid).await? {
                info!(account_id = claims.sub, role = %claims.role, "Session revoked");
            }
        }

        Ok(jar.remove(Cookie::build((self.cookie_name.clone(), "")).path("/")))
    }

    fn claims_from(&self, jar: &CookieJar) -> Option<SessionClaims> {
        jar.get(&self.cookie_name)
            .and_then(|cookie| self.decode_claims(cookie.value()))
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewAccount, Role};

    const SECRET: &str = "test-secret";

    fn manager() -> SessionManager {
        SessionManager::new(SECRET, "evura_session", false)
    }

    async fn setup() -> (Database, Account) {
        let db = Database::open_in_memory().await.unwrap();
        let account = AccountRepository::new(db.pool())
            .create(&NewAccount::new(Role::Patient, "alicealice", "a@x.com", "hash"))
            .await
            .unwrap();
        (db, account)
    }

    fn jar_with(name: &str, value: String) -> CookieJar {
        CookieJar::new().add(Cookie::new(name.to_string(), value))
    }

    #[test]
    fn test_claims_round_trip() {
        let manager = manager();
        let claims = SessionClaims {
            sid: "sid-1".to_string(),
            sub: 7,
            role: "doctor".to_string(),
            iat: 1_700_000_000,
        };

        let value = manager.encode_claims(&claims).unwrap();
        assert_eq!(manager.decode_claims(&value), Some(claims));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(manager().decode_claims("not-a-jwt").is_none());
        assert!(manager().decode_claims("").is_none());
    }

    #[tokio::test]
    async fn test_establish_and_resolve() {
        let (db, account) = setup().await;
        let manager = manager();

        let jar = manager
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();

        let cookie = jar.get("evura_session").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));

        let current = manager.resolve_current(&db, &jar).await.unwrap().unwrap();
        assert_eq!(current.id, account.id);
        assert_eq!(current.role, Role::Patient);
    }

    #[tokio::test]
    async fn test_reestablish_revokes_previous() {
        let (db, account) = setup().await;
        let manager = manager();

        let first = manager
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();
        let old_value = first.get("evura_session").unwrap().value().to_string();

        let second = manager.establish(&db, first, &account).await.unwrap();
        assert!(manager.resolve_current(&db, &second).await.unwrap().is_some());

        let sessions = SessionRepository::new(db.pool());
        assert_eq!(sessions.count_active_for_account(account.id).await.unwrap(), 1);

        // The replaced cookie no longer resolves
        let stale = jar_with("evura_session", old_value);
        assert!(manager.resolve_current(&db, &stale).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_destroy() {
        let (db, account) = setup().await;
        let manager = manager();

        let jar = manager
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();
        let value = jar.get("evura_session").unwrap().value().to_string();

        let jar = manager.destroy(&db, jar).await.unwrap();
        assert!(jar.get("evura_session").is_none());

        // Replaying the old cookie after logout fails
        let replay = jar_with("evura_session", value);
        assert!(manager.resolve_current(&db, &replay).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_destroy_without_session() {
        let (db, _) = setup().await;
        let jar = manager().destroy(&db, CookieJar::new()).await.unwrap();
        assert!(jar.get("evura_session").is_none());
    }

    #[tokio::test]
    async fn test_resolve_without_cookie() {
        let (db, _) = setup().await;
        assert!(manager()
            .resolve_current(&db, &CookieJar::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_tampered_cookie() {
        let (db, account) = setup().await;
        let manager = manager();

        let jar = manager
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();
        let mut value = jar.get("evura_session").unwrap().value().to_string();
        value.push('x');

        let tampered = jar_with("evura_session", value);
        assert!(manager.resolve_current(&db, &tampered).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_secret() {
        let (db, account) = setup().await;

        let jar = SessionManager::new("other-secret", "evura_session", false)
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();

        assert!(manager().resolve_current(&db, &jar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_mismatch() {
        let (db, account) = setup().await;
        let manager = manager();

        let jar = manager
            .establish(&db, CookieJar::new(), &account)
            .await
            .unwrap();
        let claims = manager
            .decode_claims(jar.get("evura_session").unwrap().value())
            .unwrap();

        // Same session, re-signed claiming the other role
        let forged = SessionClaims {
            role: "doctor".to_string(),
            ..claims
        };
        let forged_jar = jar_with("evura_session", manager.encode_claims(&forged).unwrap());
        assert!(manager.resolve_current(&db, &forged_jar).await.unwrap().is_none());
    }
}
