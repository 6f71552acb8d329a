use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::error::AppError;
use archive_cms::models::User;

use crate::auth::CurrentUser;
use crate::state::AppState;

/// GET /api/auth/admin/me - 当前用户信息
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(current.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "user": user,
        "authorities": current.authorities(),
    })))
}
