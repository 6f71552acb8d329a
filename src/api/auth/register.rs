use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;

use archive_cms::error::AppError;
use archive_cms::models::User;
use archive_cms::security::Role;

use crate::state::AppState;
use super::types::*;
use super::{hash_password, validate_username};

/// Reject a taken username or email with a readable message / 唯一性检查
pub async fn ensure_unique(pool: &SqlitePool, username: &str, email: Option<&str>) -> Result<(), AppError> {
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
    }

    if let Some(email) = email {
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await?;
        if taken > 0 {
            return Err(AppError::Conflict(format!("Email '{}' already exists", email)));
        }
    }
    Ok(())
}

/// Insert an account and return it / 创建用户
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
    role: Role,
    enabled: bool,
) -> Result<User, AppError> {
    let now = Utc::now().to_rfc3339();
    let id = sqlx::query(
        "INSERT INTO users (username, email, password_hash, role, enabled, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(enabled)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

/// POST /api/auth/admin/register - 注册（普通员工）
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let username = validate_username(&req.username)?;
    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
    }

    ensure_unique(&state.db, username, email).await?;
    let password_hash = hash_password(&req.password, state.config.auth.bcrypt_cost)?;
    let user = insert_user(&state.db, username, email, &password_hash, Role::Employee, true).await?;

    tracing::info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}
