//! Entry form validation for Evura.
//!
//! Field checks are declared with `validator` derives; violations are
//! collected into [`FieldErrors`], a `field -> [messages]` map the entry page
//! renders next to each input.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::db::Role;

/// Message for a missing or blank field.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Message shown when signing up with an email the role already has.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already registered. Please log in instead.";

/// Message for a submission without a CSRF token.
pub const CSRF_MISSING_MESSAGE: &str = "The CSRF token is missing.";

/// Message for a submission whose CSRF token differs from the cookie.
pub const CSRF_MISMATCH_MESSAGE: &str = "The CSRF token does not match.";

/// Which form a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormIntent {
    Signup,
    Login,
}

impl FormIntent {
    /// Form name as submitted in `form_name` and used in `active=`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormIntent::Signup => "signup",
            FormIntent::Login => "login",
        }
    }
}

impl fmt::Display for FormIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(FormIntent::Signup),
            "login" => Ok(FormIntent::Login),
            _ => Err(format!("unknown form: {s}")),
        }
    }
}

/// Raw `POST /` body. Every field defaults to empty so a missing field is
/// reported as a validation error instead of a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryForm {
    pub form_name: String,
    pub role: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub csrf_token: String,
}

impl EntryForm {
    /// Signup fields of this submission.
    pub fn signup(&self) -> SignupForm {
        SignupForm {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Login fields of this submission.
    pub fn login(&self) -> LoginForm {
        LoginForm {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

/// Signup fields.
#[derive(Debug, Clone, Validate)]
pub struct SignupForm {
    #[validate(
        custom(function = "not_blank"),
        length(min = 6, max = 30, message = "Field must be between 6 and 30 characters long.")
    )]
    pub username: String,

    #[validate(
        custom(function = "not_blank"),
        length(min = 6, max = 100, message = "Field must be between 6 and 100 characters long.")
    )]
    pub email: String,

    #[validate(
        custom(function = "not_blank"),
        length(min = 6, max = 30, message = "Field must be between 6 and 30 characters long.")
    )]
    pub password: String,
}

impl SignupForm {
    /// Run the field checks.
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// Login fields.
#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(
        custom(function = "not_blank"),
        length(min = 6, max = 100, message = "Field must be between 6 and 100 characters long.")
    )]
    pub email: String,

    #[validate(
        custom(function = "not_blank"),
        length(min = 6, max = 30, message = "Field must be between 6 and 30 characters long.")
    )]
    pub password: String,
}

impl LoginForm {
    /// Run the field checks.
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// Validate that a string is not empty after trimming whitespace.
///
/// Whitespace-only input counts as missing.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(REQUIRED_MESSAGE.into()));
    }
    Ok(())
}

/// Field-level validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages for one field (empty if the field is valid).
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a field has any message.
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold another set of errors into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Iterate over `(field, messages)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = FieldErrors::new();

        for (field, field_errors) in errors.field_errors() {
            let field = field.to_string();
            // A blank field only reports that it is required.
            let is_blank = field_errors.iter().any(|e| e.code == "required");

            for e in field_errors
                .iter()
                .filter(|e| !is_blank || e.code == "required")
            {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"));
                details.add(&field, message);
            }
        }

        details
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Role and intent of a submission whose selectors are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub role: Role,
    pub intent: FormIntent,
}

/// Check the parts of a submission every form shares: the role selector,
/// the form selector and the CSRF token.
///
/// `csrf_cookie` is the token issued with the entry page, if the browser
/// sent it back.
pub fn check_entry(form: &EntryForm, csrf_cookie: Option<&str>) -> Result<Selection, FieldErrors> {
    let mut errors = FieldErrors::new();

    let role = form.role.parse::<Role>();
    if role.is_err() {
        errors.add("role", "Please choose Patient or Doctor.");
    }

    let intent = form.form_name.parse::<FormIntent>();
    if intent.is_err() {
        errors.add("form_name", "Unknown form.");
    }

    if let Some(message) = csrf_violation(&form.csrf_token, csrf_cookie) {
        errors.add("csrf_token", message);
    }

    match (role, intent) {
        (Ok(role), Ok(intent)) if errors.is_empty() => Ok(Selection { role, intent }),
        _ => Err(errors),
    }
}

/// Compare the submitted CSRF token with the one issued in the cookie.
pub fn csrf_violation(submitted: &str, issued: Option<&str>) -> Option<&'static str> {
    match issued {
        _ if submitted.is_empty() => Some(CSRF_MISSING_MESSAGE),
        None | Some("") => Some(CSRF_MISSING_MESSAGE),
        Some(issued) if issued != submitted => Some(CSRF_MISMATCH_MESSAGE),
        Some(_) => None,
    }
}
