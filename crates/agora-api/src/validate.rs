//! Field checks applied before anything reaches the database. Limits mirror
//! the column widths of the schema.

use crate::error::{ApiError, ApiResult};

pub const USERNAME_MAX: usize = 45;
pub const EMAIL_MAX: usize = 100;
pub const NAME_MAX: usize = 45;
pub const PIC_MAX: usize = 100;
pub const CITY_MAX: usize = 45;
pub const WEBSITE_MAX: usize = 45;
pub const DESC_MAX: usize = 200;
pub const IMG_MAX: usize = 200;
pub const PASSWORD_MIN: usize = 8;

/// Trims `value` and requires it to be non-empty and at most `max` chars.
pub fn required<'a>(field: &str, value: &'a str, max: usize) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

/// Like [`required`] but absent values pass through. Blank strings count
/// as absent.
pub fn optional<'a>(field: &str, value: Option<&'a str>, max: usize) -> ApiResult<Option<&'a str>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required(field, v, max).map(Some),
    }
}

pub fn email(value: &str) -> ApiResult<&str> {
    let value = required("email", value, EMAIL_MAX)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(value),
        _ => Err(ApiError::validation("email is malformed")),
    }
}
