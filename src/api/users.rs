use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;

use archive_cms::content::paging;
use archive_cms::error::AppError;
use archive_cms::models::{CreateUserRequest, Page, UpdateUserRequest, User};
use archive_cms::security::{Permission, Role};

use crate::api::auth::{ensure_unique, hash_password, insert_user, validate_username};
use crate::api::PaginationQuery;
use crate::auth::{delete_user_sessions, CurrentUser};
use crate::state::AppState;

async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Only a super admin may hand out or touch the super admin role
fn guard_super_admin(current: &CurrentUser, role: Role) -> Result<(), AppError> {
    if role == Role::SuperAdmin && current.role != Role::SuperAdmin {
        return Err(AppError::access_denied());
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<Value>, AppError> {
    current.require(Permission::UserRead)?;
    let (page, page_size, offset) = paging(params.page, params.page_size);

    let (users, total) = match params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => {
            let search_pattern = format!("%{}%", search);
            let users = sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE username LIKE ? OR email LIKE ? ORDER BY id DESC LIMIT ? OFFSET ?"
            )
            .bind(&search_pattern)
            .bind(&search_pattern)
            .bind(page_size)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;

            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username LIKE ? OR email LIKE ?")
                .bind(&search_pattern)
                .bind(&search_pattern)
                .fetch_one(&state.db)
                .await?;

            (users, total)
        }
        None => {
            let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC LIMIT ? OFFSET ?")
                .bind(page_size)
                .bind(offset)
                .fetch_all(&state.db)
                .await?;

            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&state.db)
                .await?;

            (users, total)
        }
    };

    Ok(Json(json!(Page::new(users, total, page, page_size))))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    current.require(Permission::UserCreate)?;
    let role = req.role.unwrap_or(Role::Employee);
    guard_super_admin(&current, role)?;

    let username = validate_username(&req.username)?;
    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    ensure_unique(&state.db, username, email).await?;

    let password_hash = hash_password(&req.password, state.config.auth.bcrypt_cost)?;
    let user = insert_user(&state.db, username, email, &password_hash, role, req.enabled.unwrap_or(true)).await?;

    tracing::info!("{} created user {} ({})", current.username, user.username, role);
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    current.require(Permission::UserRead)?;

    let user = fetch_user(&state.db, id).await?;
    let authorities = archive_cms::security::authorities(user.role()?);

    Ok(Json(json!({
        "user": user,
        "authorities": authorities,
    })))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    current.require(Permission::UserUpdate)?;

    let user = fetch_user(&state.db, id).await?;
    guard_super_admin(&current, user.role()?)?;
    if let Some(role) = req.role {
        guard_super_admin(&current, role)?;
    }
    if id == current.id && (req.role.is_some() || req.enabled == Some(false)) {
        return Err(AppError::Validation("Cannot change your own role or disable yourself".to_string()));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = state.db.begin().await?;

    if let Some(email) = &req.email {
        let email = email.trim();
        sqlx::query("UPDATE users SET email = ?, updated_at = ? WHERE id = ?")
            .bind(if email.is_empty() { None } else { Some(email) })
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    // Credentials or access changed, old sessions must go
    let mut revoke_sessions = false;

    if let Some(password) = &req.password {
        let password_hash = hash_password(password, state.config.auth.bcrypt_cost)?;
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        revoke_sessions = true;
    }

    if let Some(role) = req.role {
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        revoke_sessions = true;
    }

    if let Some(enabled) = req.enabled {
        sqlx::query("UPDATE users SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        revoke_sessions |= !enabled;
    }

    tx.commit().await?;

    if revoke_sessions {
        delete_user_sessions(&state.db, id).await?;
    }

    let user = fetch_user(&state.db, id).await?;
    tracing::info!("{} updated user {}", current.username, user.username);
    Ok(Json(json!({ "user": user })))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    current.require(Permission::UserDelete)?;
    if id == current.id {
        return Err(AppError::Validation("Cannot delete yourself".to_string()));
    }

    let user = fetch_user(&state.db, id).await?;

    // Sessions go with the user via ON DELETE CASCADE
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    tracing::info!("{} deleted user {}", current.username, user.username);
    Ok(Json(json!({ "message": "User deleted" })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_admin_user_lifecycle() {
        let app = spawn_app().await;
        let admin = app.admin_token().await;

        let (status, body) = app
            .post("/api/users", &admin, json!({"username": "karwan", "password": "secret12", "role": "ADMIN"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["user"]["id"].as_i64().unwrap();

        let (status, body) = app.get(&format!("/api/users/{}", id), &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authorities"], json!(["user:create", "user:read", "user:update", "ROLE_ADMIN"]));

        let (status, body) = app.get("/api/users?search=karw", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, _) = app.post(&format!("/api/users/{}/delete", id), &admin, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.get(&format!("/api/users/{}", id), &admin).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_permissions_follow_role() {
        let app = spawn_app().await;
        let super_admin = app.admin_token().await;
        app.post("/api/users", &super_admin, json!({"username": "employee1", "password": "secret12"})).await;
        app.post("/api/users", &super_admin, json!({"username": "admin1", "password": "secret12", "role": "ADMIN"}))
            .await;

        let employee = app.login("employee1", "secret12").await;
        let (status, _) = app.get("/api/users", &employee).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.post("/api/users", &employee, json!({"username": "x", "password": "secret12"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Access denied");

        let admin = app.login("admin1", "secret12").await;
        let (status, _) = app.post("/api/users", &admin, json!({"username": "y", "password": "secret12"})).await;
        assert_eq!(status, StatusCode::CREATED);
        // Admins cannot delete or mint super admins
        let (status, _) = app.post("/api/users/1/delete", &admin, json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app
            .post("/api/users", &admin, json!({"username": "z", "password": "secret12", "role": "SUPER_ADMIN"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let app = spawn_app().await;
        let admin = app.admin_token().await;
        let (status, _) = app.post("/api/users/1/delete", &admin, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_disabling_user_drops_sessions() {
        let app = spawn_app().await;
        let admin = app.admin_token().await;
        let (_, body) = app.post("/api/users", &admin, json!({"username": "soran", "password": "secret12"})).await;
        let id = body["user"]["id"].as_i64().unwrap();
        let token = app.login("soran", "secret12").await;

        let (status, body) = app.post(&format!("/api/users/{}", id), &admin, json!({"enabled": false})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["enabled"], false);

        let (status, _) = app.get("/api/auth/admin/me", &token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
