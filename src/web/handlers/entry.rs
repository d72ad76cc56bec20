//! Entry page handlers: signup and login for both roles.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::auth::validation::{self, DUPLICATE_EMAIL_MESSAGE};
use crate::auth::{self, AuthError, EntryForm, FieldErrors, FormIntent};
use crate::db::Role;
use crate::template::{TemplateContext, Value, INDEX_PAGE};
use crate::web::csrf;
use crate::web::error::PageError;
use crate::web::flash::{self, Flash};

/// Fields whose errors are shown above the forms instead of beside an input.
const GENERAL_FIELDS: &[&str] = &["role", "form_name", "csrf_token"];

/// Query parameters of `GET /`.
#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    /// Preselected role (`patient` or `doctor`).
    pub role: Option<String>,
    /// Preselected tab (`signup` or `login`).
    pub active: Option<String>,
}

/// URL of the entry page with a role and tab preselected.
pub fn entry_url(role: Role, intent: FormIntent) -> String {
    format!("/?role={role}&active={intent}")
}

/// Everything the entry page template needs.
struct EntryPage<'a> {
    role: Role,
    intent: FormIntent,
    csrf_token: &'a str,
    flashes: &'a [Flash],
    submitted: Option<&'a EntryForm>,
    errors: &'a FieldErrors,
}

impl EntryPage<'_> {
    fn context(&self) -> TemplateContext {
        let mut ctx = TemplateContext::new();

        ctx.set("role", self.role.as_str());
        ctx.set("role_title", self.role.display_name());
        ctx.set("is_patient", self.role == Role::Patient);
        ctx.set("is_doctor", self.role == Role::Doctor);
        ctx.set("active", self.intent.as_str());
        ctx.set("is_signup", self.intent == FormIntent::Signup);
        ctx.set("is_login", self.intent == FormIntent::Login);
        ctx.set("csrf_token", self.csrf_token);
        ctx.set(
            "flashes",
            Value::List(self.flashes.iter().map(Flash::to_value).collect()),
        );

        let general: Vec<Value> = GENERAL_FIELDS
            .iter()
            .flat_map(|field| self.errors.get(field))
            .map(|message| Value::from(message.as_str()))
            .collect();
        ctx.set("general_errors", Value::List(general));

        let field_errors = Value::object(
            self.errors
                .iter()
                .filter(|(field, _)| !GENERAL_FIELDS.contains(field))
                .map(|(field, messages)| {
                    let messages = messages.iter().map(|m| Value::from(m.as_str())).collect();
                    (field, Value::List(messages))
                }),
        );

        // Passwords are never echoed back
        match self.intent {
            FormIntent::Signup => {
                if let Some(form) = self.submitted {
                    ctx.set(
                        "signup",
                        Value::object([
                            ("username", Value::from(form.username.as_str())),
                            ("email", Value::from(form.email.as_str())),
                        ]),
                    );
                }
                ctx.set("signup_errors", field_errors);
            }
            FormIntent::Login => {
                if let Some(form) = self.submitted {
                    ctx.set(
                        "login",
                        Value::object([("email", Value::from(form.email.as_str()))]),
                    );
                }
                ctx.set("login_errors", field_errors);
            }
        }

        ctx
    }
}

/// GET / - Render the signup and login forms.
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EntryQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), PageError> {
    let role = query
        .role
        .as_deref()
        .and_then(|r| r.parse().ok())
        .unwrap_or(Role::Patient);
    let intent = query
        .active
        .as_deref()
        .and_then(|a| a.parse().ok())
        .unwrap_or(FormIntent::Signup);

    let (jar, csrf_token) = csrf::ensure_token(jar, state.secure_cookies());
    let (jar, flashes) = flash::take(jar);
    let no_errors = FieldErrors::new();

    let page = EntryPage {
        role,
        intent,
        csrf_token: &csrf_token,
        flashes: &flashes,
        submitted: None,
        errors: &no_errors,
    };
    let html = state.render(INDEX_PAGE, &page.context())?;

    Ok((jar, html))
}

/// POST / - Handle a signup or login submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<EntryForm>,
) -> Result<Response, PageError> {
    let issued = csrf::issued_token(&jar);

    let selection = match validation::check_entry(&form, issued.as_deref()) {
        Ok(selection) => selection,
        Err(mut errors) => {
            let role = form.role.parse().unwrap_or(Role::Patient);
            let intent = form.form_name.parse::<FormIntent>().ok();
            if let Some(intent) = intent {
                if let Err(field_errors) = check_fields(intent, &form) {
                    errors.merge(field_errors);
                }
            }
            let intent = intent.unwrap_or(FormIntent::Signup);
            return render_invalid(&state, jar, &form, role, intent, &errors);
        }
    };

    match selection.intent {
        FormIntent::Signup => handle_signup(&state, jar, selection.role, &form).await,
        FormIntent::Login => handle_login(&state, jar, selection.role, &form).await,
    }
}

fn check_fields(intent: FormIntent, form: &EntryForm) -> Result<(), FieldErrors> {
    match intent {
        FormIntent::Signup => form.signup().check(),
        FormIntent::Login => form.login().check(),
    }
}

async fn handle_signup(
    state: &AppState,
    jar: CookieJar,
    role: Role,
    form: &EntryForm,
) -> Result<Response, PageError> {
    let secure = state.secure_cookies();

    match auth::signup(&state.db, role, &form.signup()).await {
        Ok(account) => {
            let jar = state.sessions.establish(&state.db, jar, &account).await?;
            let message = format!(
                "Account created successfully as {}! Redirecting to dashboard...",
                role.display_name()
            );
            let jar = flash::push(jar, Flash::success(message), secure);
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        Err(AuthError::DuplicateEmail) => {
            let jar = flash::push(jar, Flash::warning(DUPLICATE_EMAIL_MESSAGE), secure);
            let target = entry_url(role, FormIntent::Signup);
            Ok((jar, Redirect::to(&target)).into_response())
        }
        Err(AuthError::Validation(errors)) => {
            render_invalid(state, jar, form, role, FormIntent::Signup, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_login(
    state: &AppState,
    jar: CookieJar,
    role: Role,
    form: &EntryForm,
) -> Result<Response, PageError> {
    let secure = state.secure_cookies();

    match auth::login(&state.db, role, &form.login()).await {
        Ok(account) => {
            let jar = state.sessions.establish(&state.db, jar, &account).await?;
            let message = format!(
                "Welcome {}! Logged in as {}.",
                account.username,
                role.display_name()
            );
            let jar = flash::push(jar, Flash::success(message), secure);
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            let message = format!(
                "Invalid credentials or incorrect role ({}).",
                role.display_name()
            );
            let jar = flash::push(jar, Flash::danger(message), secure);
            let target = entry_url(role, FormIntent::Login);
            Ok((jar, Redirect::to(&target)).into_response())
        }
        Err(AuthError::Validation(errors)) => {
            render_invalid(state, jar, form, role, FormIntent::Login, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// Re-render the entry page with field errors (422).
fn render_invalid(
    state: &AppState,
    jar: CookieJar,
    form: &EntryForm,
    role: Role,
    intent: FormIntent,
    errors: &FieldErrors,
) -> Result<Response, PageError> {
    debug!(role = %role, intent = %intent, "Entry form rejected: {}", errors);

    let (jar, csrf_token) = csrf::ensure_token(jar, state.secure_cookies());
    let page = EntryPage {
        role,
        intent,
        csrf_token: &csrf_token,
        flashes: &[],
        submitted: Some(form),
        errors,
    };
    let html = state.render(INDEX_PAGE, &page.context())?;

    Ok((StatusCode::UNPROCESSABLE_ENTITY, jar, html).into_response())
}
