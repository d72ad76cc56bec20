//! Session guard for protected pages.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::Account;
use crate::web::error::PageError;
use crate::web::handlers::AppState;

/// Extractor for the account bound to the browser session.
///
/// Handlers that take this extractor never run without a live session:
/// requests without one are redirected to the entry page.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentAccount {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        match state.sessions.resolve_current(&state.db, &jar).await {
            Ok(Some(account)) => Ok(CurrentAccount(account)),
            Ok(None) => {
                tracing::debug!("No session for {}, redirecting", parts.uri.path());
                Err(Redirect::to("/").into_response())
            }
            Err(e) => Err(PageError::from(e).into_response()),
        }
    }
}
