//! Dashboard and logout handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use super::AppState;
use crate::db::Account;
use crate::template::{TemplateContext, Value, DASHBOARD_PAGE};
use crate::web::error::PageError;
use crate::web::flash::{self, Flash};
use crate::web::middleware::CurrentAccount;

/// Template value describing an account. The password hash is left out.
fn account_value(account: &Account) -> Value {
    Value::object([
        ("id", Value::Number(account.id)),
        ("username", Value::from(account.username.as_str())),
        ("email", Value::from(account.email.as_str())),
        ("role", Value::from(account.role.display_name())),
        ("created_at", Value::from(account.created_at.as_str())),
        ("last_login", Value::from(account.last_login.clone())),
    ])
}

/// GET /dashboard - Show the logged-in account.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), PageError> {
    let (jar, flashes) = flash::take(jar);

    let mut ctx = TemplateContext::new();
    ctx.set("account", account_value(&account));
    ctx.set(
        "flashes",
        Value::List(flashes.iter().map(Flash::to_value).collect()),
    );

    let html = state.render(DASHBOARD_PAGE, &ctx)?;
    Ok((jar, html))
}

/// GET /logout - End the session and return to the entry page.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentAccount(account): CurrentAccount,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), PageError> {
    let jar = state.sessions.destroy(&state.db, jar).await?;
    info!(account_id = account.id, role = %account.role, "Account logged out");

    Ok((jar, Redirect::to("/")))
}
