use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::error::AppError;
use archive_cms::models::User;
use archive_cms::security::{Permission, Role};

use crate::auth::{delete_user_sessions, CurrentUser};
use crate::state::AppState;
use super::hash_password;
use super::types::*;

/// POST /api/users/:id/reset-code - 生成密码重置码
///
/// The code is handed to the account owner out of band and is valid for ten
/// minutes.
pub async fn issue_reset_code(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    current.require(Permission::UserUpdate)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if user.role()? == Role::SuperAdmin && current.role != Role::SuperAdmin {
        return Err(AppError::access_denied());
    }

    // 生成6位验证码
    let code: String = {
        let mut rng = rand::thread_rng();
        (0..6).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
    };
    state.login_security.store_reset_code(user.username.clone(), user.id, code.clone());

    tracing::info!("{} issued a reset code for {}", current.username, user.username);
    Ok(Json(json!({
        "username": user.username,
        "code": code,
        "expires_in": 10 * 60,
    })))
}

/// POST /api/auth/admin/reset-password - 重置密码
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let password_hash = hash_password(&req.new_password, state.config.auth.bcrypt_cost)?;

    // 验证重置码
    let user_id = state
        .login_security
        .verify_reset_code(req.username.trim(), req.code.trim())
        .ok_or_else(|| AppError::Validation("Invalid or expired reset code".to_string()))?;

    let now = Utc::now().to_rfc3339();
    let updated = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(&now)
        .bind(user_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound("User"));
    }

    // 清除该用户所有会话
    delete_user_sessions(&state.db, user_id).await?;

    Ok(Json(json!({ "message": "Password has been reset" })))
}
