use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 120;
pub const MAX_FIELD_LEN: usize = 255;
pub const MAX_SALARY_LEN: usize = 100;

/// Trims `value` and rejects it when blank or longer than `max_len` characters.
pub fn required(field: &str, value: Option<&str>, max_len: usize) -> AppResult<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Lower-cases and checks the `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if email.chars().count() > MAX_FIELD_LEN || !is_valid_email(&email) {
        return Err(AppError::bad_request("invalid email format"));
    }
    Ok(email)
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn normalize_phone(raw: &str) -> AppResult<String> {
    let phone = raw.trim();
    let digits_only = phone.chars().all(|ch| ch.is_ascii_digit());
    if !digits_only || !(10..=15).contains(&phone.len()) {
        return Err(AppError::bad_request(
            "phone number must contain only digits (10-15 characters)",
        ));
    }
    Ok(phone.to_string())
}
