//! Bearer session authentication / 会话认证
//!
//! Tokens are opaque random strings handed out once at login; only their
//! SHA-256 digest is stored. Logout blacklists the digest.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

use archive_cms::error::{AppError, FORBIDDEN};
use archive_cms::security::{self, Permission, Role};

use crate::state::AppState;

/// Authenticated caller, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has(permission) {
            Ok(())
        } else {
            tracing::debug!("{} lacks {}", self.username, permission);
            Err(AppError::access_denied())
        }
    }

    pub fn authorities(&self) -> Vec<String> {
        security::authorities(self.role)
    }
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Bearer token from the request headers, if any
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(security::parse_bearer)
        .map(str::to_string)
}

/// Create a session and return the raw token / 创建会话
pub async fn create_session(pool: &SqlitePool, user_id: i64, ttl_hours: i64) -> Result<String, AppError> {
    let token = generate_token();
    let now = Utc::now();
    let expires_at = now.timestamp() + ttl_hours * 60 * 60;

    // Drop this user's expired sessions while we are here
    sqlx::query("DELETE FROM sessions WHERE user_id = ? AND expires_at <= ?")
        .bind(user_id)
        .bind(now.timestamp())
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a bearer token to its user / 验证令牌
pub async fn verify_token(pool: &SqlitePool, token: &str) -> Result<CurrentUser, AppError> {
    let digest = hash_token(token);

    let blacklisted: Option<String> = sqlx::query_scalar("SELECT token_hash FROM token_blacklist WHERE token_hash = ?")
        .bind(&digest)
        .fetch_optional(pool)
        .await?;
    if blacklisted.is_some() {
        return Err(AppError::token_not_verified());
    }

    let row: Option<(i64, String, String, bool)> = sqlx::query_as(
        "SELECT u.id, u.username, u.role, u.enabled FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ? AND s.expires_at > ?"
    )
    .bind(&digest)
    .bind(Utc::now().timestamp())
    .fetch_optional(pool)
    .await?;

    let (id, username, role, enabled) = row.ok_or_else(AppError::token_not_verified)?;
    if !enabled {
        return Err(AppError::Forbidden(FORBIDDEN.to_string()));
    }
    let role = role.parse::<Role>().map_err(AppError::Internal)?;

    Ok(CurrentUser { id, username, role })
}

/// Blacklist the token and drop its session / 注销令牌
///
/// A blacklist row lives as long as the session it revokes would have; past that the
/// session lookup rejects the token anyway, so expired rows are pruned here.
pub async fn revoke_token(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    let digest = hash_token(token);
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= ?")
        .bind(now.timestamp())
        .execute(&mut *tx)
        .await?;

    let session_expiry: Option<i64> = sqlx::query_scalar("SELECT expires_at FROM sessions WHERE token_hash = ?")
        .bind(&digest)
        .fetch_optional(&mut *tx)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO token_blacklist (token_hash, revoked_at, expires_at) VALUES (?, ?, ?)")
        .bind(&digest)
        .bind(now.to_rfc3339())
        .bind(session_expiry.unwrap_or_else(|| now.timestamp()))
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(&digest)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Drop every session of a user (password change, role change, disable)
pub async fn delete_user_sessions(pool: &SqlitePool, user_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Cleared {} sessions of user {}", result.rows_affected(), user_id);
    }
    Ok(())
}

/// Middleware guarding every route outside the public allowlist
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if security::is_public_route(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or_else(AppError::token_not_verified)?;
    let user = verify_token(&state.db, &token).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
