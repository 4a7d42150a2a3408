//! Form validation and sanitization.
//!
//! Rules always run against the raw submitted values and every rule is
//! evaluated before deciding. Sanitization (trim, HTML-escape, markup filter)
//! only happens once validation has passed.

use serde::Deserialize;

use crate::{EventInput, RegistrationInput};

/// Maximum length of a name, in characters.
pub const NAME_MAX: usize = 64;
/// Maximum length of a description or comment, in characters.
pub const TEXT_MAX: usize = 400;

pub const NAME_MESSAGE: &str = "Name must be between 1 and 64 characters";
pub const DESCRIPTION_MESSAGE: &str = "Description may be at most 400 characters";
pub const COMMENT_MESSAGE: &str = "Comment may be at most 400 characters";

/// Raw event form as submitted by an admin.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct EventForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Raw registration form as submitted by a visitor.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

/// A failed rule. `field` is empty for errors that concern the whole form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// An error not tied to any single input.
    pub fn general(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

/// Whether `field` has at least one error in `errors`.
pub fn is_invalid(field: &str, errors: &[FieldError]) -> bool {
    errors.iter().any(|e| e.field == field)
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if !length_between(name, 1, NAME_MAX) {
        errors.push(FieldError::new("name", NAME_MESSAGE));
    }
}

fn check_text(field: &'static str, value: &str, message: &str, errors: &mut Vec<FieldError>) {
    if !length_between(value, 0, TEXT_MAX) {
        errors.push(FieldError::new(field, message));
    }
}

pub fn validate_event(form: &EventForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    check_name(&form.name, &mut errors);
    check_text("description", &form.description, DESCRIPTION_MESSAGE, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_registration(form: &RegistrationForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    check_name(&form.name, &mut errors);
    check_text("comment", &form.comment, COMMENT_MESSAGE, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Escape characters that are significant in HTML, the same set form
/// validators conventionally escape.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            other => out.push(other),
        }
    }
    out
}

/// Neutralize any markup left in `s`: angle brackets are entity-encoded so no
/// tag can survive. A no-op on text that already went through [`escape`].
pub fn filter_xss(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

/// Trim, escape, then filter one free-text value. After [`escape`] the
/// filter has nothing left to change; it only guards callers that skip it.
pub fn sanitize(s: &str) -> String {
    filter_xss(&escape(s.trim()))
}

pub fn sanitize_event(form: &EventForm) -> EventInput {
    EventInput {
        name: sanitize(&form.name),
        description: sanitize(&form.description),
    }
}

pub fn sanitize_registration(form: &RegistrationForm) -> RegistrationInput {
    RegistrationInput {
        name: sanitize(&form.name),
        comment: sanitize(&form.comment),
    }
}
