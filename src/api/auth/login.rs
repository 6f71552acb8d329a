use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use archive_cms::error::{AppError, FORBIDDEN};
use archive_cms::models::User;
use archive_cms::security::{self, BEARER_PREFIX};

use crate::auth::{bearer_token, create_session, revoke_token};
use crate::state::AppState;
use super::types::*;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// POST /api/auth/admin/login - 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let ip = addr.ip().to_string();

    // 检查IP是否被封禁
    if state.login_security.is_ip_blocked(&ip) {
        tracing::warn!("Login blocked for {}", ip);
        return Err(AppError::TooManyAttempts);
    }

    // Username or email
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE username = ? OR email = ?"
    )
    .bind(req.username.trim())
    .bind(req.username.trim())
    .fetch_optional(&state.db)
    .await?;

    let Some(user) = user else {
        state.login_security.record_failure(&ip);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        state.login_security.record_failure(&ip);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    // Right password on a disabled account is not a failed guess
    if !user.enabled {
        tracing::warn!("Disabled user {} tried to log in", user.username);
        return Err(AppError::Forbidden(FORBIDDEN.to_string()));
    }

    // 登录成功，清除失败记录
    state.login_security.clear_failure(&ip);

    let ttl_hours = state.config.auth.session_ttl_hours;
    let token = create_session(&state.db, user.id, ttl_hours).await?;

    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(&now)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    let role = user.role()?;
    tracing::info!("User {} logged in from {}", user.username, ip);

    Ok(Json(json!({
        "token": token,
        "token_type": BEARER_PREFIX.trim(),
        "expires_in": ttl_hours * 60 * 60,
        "user": user,
        "authorities": security::authorities(role),
    })))
}

/// POST /api/auth/admin/logout - 注销，令牌加入黑名单
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = bearer_token(&headers).ok_or_else(AppError::token_not_verified)?;
    revoke_token(&state.db, &token).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_returns_bearer_token_and_authorities() {
        let app = spawn_app().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/admin/login",
                None,
                Some(json!({"username": "admin", "password": app.admin_password})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["token"].as_str().unwrap().len(), 64);
        assert_eq!(body["user"]["role"], "SUPER_ADMIN");
        assert!(body["user"].get("password_hash").is_none());
        let authorities: Vec<&str> = body["authorities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(authorities.contains(&"user:delete"));
        assert!(authorities.contains(&"ROLE_SUPER_ADMIN"));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected_then_throttled() {
        let app = spawn_app().await;
        let wrong = json!({"username": "admin", "password": "wrong-password"});

        for _ in 0..5 {
            let (status, body) = app
                .send(Method::POST, "/api/auth/admin/login", None, Some(wrong.clone()))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Invalid username or password");
        }

        // Even the right password is refused while the IP is blocked
        let right = json!({"username": "admin", "password": app.admin_password});
        let (status, _) = app.send(Method::POST, "/api/auth/admin/login", None, Some(right)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_disabled_account_login_forbidden() {
        let app = spawn_app().await;
        let admin = app.admin_token().await;
        let (_, body) = app.post("/api/users", &admin, json!({"username": "soran", "password": "secret12"})).await;
        let id = body["user"]["id"].as_i64().unwrap();
        app.post(&format!("/api/users/{}", id), &admin, json!({"enabled": false})).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/admin/login",
                None,
                Some(json!({"username": "soran", "password": "secret12"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");

        // A wrong password still reads as bad credentials
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/admin/login",
                None,
                Some(json!({"username": "soran", "password": "nope"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_blacklists_token() {
        let app = spawn_app().await;
        let token = app.admin_token().await;

        let (status, _) = app.get("/api/auth/admin/me", &token).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(Method::POST, "/api/auth/admin/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/api/auth/admin/me", &token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token can not be verified");
    }
}
