use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::content::{self, news};
use archive_cms::error::AppError;
use archive_cms::models::{ContentKind, NewsInput};

use crate::api::{MediaQuery, PaginationQuery, SearchParams};
use crate::auth::CurrentUser;
use crate::state::AppState;

pub async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<Value>, AppError> {
    let page = news::list(&state.db, params.page, params.page_size).await?;
    Ok(Json(json!(page)))
}

pub async fn create_news(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<NewsInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let news = news::create(&state.db, &input, Some(&current.username)).await?;
    Ok((StatusCode::CREATED, Json(json!(news))))
}

pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let news = news::get(&state.db, id).await?.ok_or(AppError::NotFound("News"))?;
    Ok(Json(json!(news)))
}

pub async fn update_news(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<NewsInput>,
) -> Result<Json<Value>, AppError> {
    let news = news::update(&state.db, id, &input, Some(&current.username))
        .await?
        .ok_or(AppError::NotFound("News"))?;
    Ok(Json(json!(news)))
}

pub async fn delete_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !news::delete(&state.db, id).await? {
        return Err(AppError::NotFound("News"));
    }
    Ok(Json(json!({ "message": "News deleted" })))
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let items = news::search(&state.db, &params.q).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn news_by_tag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let items = news::find_by_tag(&state.db, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn news_by_keyword(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let items = news::find_by_keyword(&state.db, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn news_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<Value>, AppError> {
    let media = content::item_media(&state.db, ContentKind::News, id, query.media_type()?)
        .await?
        .ok_or(AppError::NotFound("News"))?;
    Ok(Json(json!({ "items": media })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_news_round_trip() {
        let app = spawn_app().await;
        let token = app.admin_token().await;

        let (status, body) = app
            .post(
                "/api/news",
                &token,
                json!({
                    "ckb": {"title": "پێشانگای نوێ"},
                    "kmr": {"title": "Pêşangeha nû"},
                    "tags": ["exhibition"],
                    "media": [{"type": "VIDEO", "url": "videos/opening.mp4"}]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        assert_eq!(body["media"][0]["sortOrder"], 0);

        let (_, body) = app.get("/api/news/search?q=P%C3%8A%C5%9EANG", &token).await;
        assert_eq!(body["total"], 1);
        let (_, body) = app.get("/api/news/by-tag/Exhibition", &token).await;
        assert_eq!(body["total"], 1);

        let (status, body) = app
            .post(&format!("/api/news/{}", id), &token, json!({"kmr": {"title": "Pêşangeh"}}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["ckb"].is_null());
        assert_eq!(body["updatedBy"], "admin");

        let (_, body) = app.get(&format!("/api/news/{}/media", id), &token).await;
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_news_is_not_found() {
        let app = spawn_app().await;
        let token = app.admin_token().await;
        let (status, _) = app.get("/api/news/999", &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.get("/api/news/999/media", &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
