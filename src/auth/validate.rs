use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::dto::{LoginPayload, LoginRequest, RegisterPayload, RegisterRequest, RefreshRequest};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: Option<String>, label: &str, errors: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            errors.push(format!("{label} is required"));
            String::new()
        }
    }
}

/// Checks an email field: presence, then format, trimming and lowercasing on
/// the way through. Both violations can be reported for the same request.
fn required_email(value: Option<String>, errors: &mut Vec<String>) -> String {
    let email = required(value, "Email", errors);
    if email.is_empty() {
        return email;
    }
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.push("Email must be a valid email".into());
    }
    email
}

fn finish<T>(payload: T, errors: Vec<String>) -> Result<T, ApiError> {
    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(ApiError::InvalidRequest(errors.join(", ")))
    }
}

impl RegisterRequest {
    pub fn validate(self) -> Result<RegisterPayload, ApiError> {
        let mut errors = Vec::new();
        let email = required_email(self.email, &mut errors);
        let username = required(self.username, "Username", &mut errors);
        let password = required(self.password, "Password", &mut errors);
        let confirm_password = required(self.confirm_password, "Confirm password", &mut errors);
        let name = required(self.name, "Name", &mut errors);
        finish(
            RegisterPayload {
                email,
                username,
                password,
                confirm_password,
                name,
            },
            errors,
        )
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<LoginPayload, ApiError> {
        let mut errors = Vec::new();
        let email = required_email(self.email, &mut errors);
        let password = required(self.password, "Password", &mut errors);
        finish(LoginPayload { email, password }, errors)
    }
}

impl RefreshRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut errors = Vec::new();
        let refresh_token = required(self.refresh_token, "Refresh token", &mut errors);
        finish(refresh_token, errors)
    }
}

/// Password composition policy. Every broken rule is reported, not just the
/// first one.
pub fn check_password_policy(password: &str) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    let len = password.chars().count();
    if len < 8 {
        violations.push("The string should have a minimum length of 8 characters");
    }
    if len > 100 {
        violations.push("The string should have a maximum length of 100 characters");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        violations.push("The string should have a minimum of 1 uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        violations.push("The string should have a minimum of 1 lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("The string should have a minimum of 1 digit");
    }
    if password.chars().any(|c| c.is_whitespace()) {
        violations.push("The string should not have spaces");
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidPassword(violations.join(", ")))
    }
}
