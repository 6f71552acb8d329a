pub mod types;
pub mod login;
pub mod register;
pub mod password;
pub mod profile;

pub use login::*;
pub use register::*;
pub use password::*;
pub use profile::*;

use archive_cms::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Check length and hash with the configured cost / 密码哈希
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    bcrypt::hash(password, cost).map_err(|e| AppError::Internal(e.to_string()))
}

pub fn validate_username(username: &str) -> Result<&str, AppError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > 64 {
        return Err(AppError::Validation("Username must be 1-64 characters".to_string()));
    }
    Ok(username)
}
