use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::content::{self, writing};
use archive_cms::error::AppError;
use archive_cms::models::{ContentKind, Language, WritingInput};

use crate::api::{MediaQuery, PaginationQuery, SearchParams};
use crate::auth::CurrentUser;
use crate::state::AppState;

fn parse_language(raw: &str) -> Result<Language, AppError> {
    raw.parse().map_err(AppError::Validation)
}

pub async fn list_writings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<Value>, AppError> {
    let page = writing::list(&state.db, params.page, params.page_size).await?;
    Ok(Json(json!(page)))
}

pub async fn create_writing(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<WritingInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let writing = writing::create(&state.db, &input, Some(&current.username)).await?;
    Ok((StatusCode::CREATED, Json(json!(writing))))
}

pub async fn get_writing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let writing = writing::get(&state.db, id).await?.ok_or(AppError::NotFound("Writing"))?;
    Ok(Json(json!(writing)))
}

pub async fn update_writing(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<WritingInput>,
) -> Result<Json<Value>, AppError> {
    let writing = writing::update(&state.db, id, &input, Some(&current.username))
        .await?
        .ok_or(AppError::NotFound("Writing"))?;
    Ok(Json(json!(writing)))
}

pub async fn delete_writing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !writing::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Writing"));
    }
    Ok(Json(json!({ "message": "Writing deleted" })))
}

pub async fn search_writings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let items = writing::search(&state.db, &params.q).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

/// GET /api/writings/by-tag/:language/:name - 按语言精确匹配标签
pub async fn writings_by_tag(
    State(state): State<Arc<AppState>>,
    Path((language, name)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let items = writing::find_by_tag(&state.db, parse_language(&language)?, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn writings_by_keyword(
    State(state): State<Arc<AppState>>,
    Path((language, name)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let items = writing::find_by_keyword(&state.db, parse_language(&language)?, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn writing_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<Value>, AppError> {
    let media = content::item_media(&state.db, ContentKind::Writing, id, query.media_type()?)
        .await?
        .ok_or(AppError::NotFound("Writing"))?;
    Ok(Json(json!({ "items": media })))
}
