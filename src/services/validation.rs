use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
        .expect("email pattern compiles");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trims and validates an email address. Case is kept as provided.
pub fn require_email(raw: Option<&str>) -> Result<String, AppError> {
    let email = required_text(raw, "Email is required")?;
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email address"));
    }
    Ok(email)
}

/// Trimmed value, or `BadRequest(message)` when absent or blank.
pub fn required_text(raw: Option<&str>, message: &str) -> Result<String, AppError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::bad_request(message)),
    }
}

/// Blank strings collapse to `None`.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
