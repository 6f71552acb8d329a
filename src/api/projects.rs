use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::content::{self, project};
use archive_cms::error::AppError;
use archive_cms::models::{ContentKind, ProjectInput};

use crate::api::{MediaQuery, PaginationQuery, SearchParams};
use crate::auth::CurrentUser;
use crate::state::AppState;

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<Value>, AppError> {
    let page = project::list(&state.db, params.page, params.page_size).await?;
    Ok(Json(json!(page)))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let project = project::create(&state.db, &input, Some(&current.username)).await?;
    Ok((StatusCode::CREATED, Json(json!(project))))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let project = project::get(&state.db, id).await?.ok_or(AppError::NotFound("Project"))?;
    Ok(Json(json!(project)))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<Value>, AppError> {
    let project = project::update(&state.db, id, &input, Some(&current.username))
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    Ok(Json(json!(project)))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !project::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Project"));
    }
    Ok(Json(json!({ "message": "Project deleted" })))
}

/// GET /api/projects/search?q= - 标题、标签、关键词子串搜索
pub async fn search_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let items = project::search(&state.db, &params.q).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn projects_by_tag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let items = project::find_by_tag(&state.db, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

pub async fn projects_by_keyword(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let items = project::find_by_keyword(&state.db, &name).await?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

/// GET /api/projects/:id/media?type= - 有序媒体
pub async fn project_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<Value>, AppError> {
    let media = content::item_media(&state.db, ContentKind::Project, id, query.media_type()?)
        .await?
        .ok_or(AppError::NotFound("Project"))?;
    Ok(Json(json!({ "items": media })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_project_crud_and_search() {
        let app = spawn_app().await;
        let token = app.admin_token().await;

        let (status, body) = app
            .post(
                "/api/projects",
                &token,
                json!({
                    "title": "Erbil Citadel Survey",
                    "location": "Hewlêr",
                    "tags": ["heritage", "Heritage Sites", "archaeology"],
                    "keywords": ["citadel"],
                    "media": [
                        {"type": "IMAGE", "url": "images/b.jpg", "sortOrder": 2},
                        {"type": "PDF", "url": "pdfs/report.pdf", "sortOrder": 0},
                        {"type": "IMAGE", "url": "images/a.jpg", "sortOrder": 1}
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["createdBy"], "admin");
        let id = body["id"].as_i64().unwrap();

        // Three tags match "herit"/"arch" but the project is listed once
        let (_, body) = app.get("/api/projects/search?q=HERIT", &token).await;
        assert_eq!(body["total"], 1);
        let (_, body) = app.get("/api/projects/search?q=a", &token).await;
        assert_eq!(body["total"], 1);

        let (_, body) = app.get("/api/projects/by-tag/HERITAGE", &token).await;
        assert_eq!(body["items"][0]["id"], id);
        let (_, body) = app.get("/api/projects/by-keyword/citadel", &token).await;
        assert_eq!(body["total"], 1);

        let (_, body) = app.get(&format!("/api/projects/{}/media", id), &token).await;
        let orders: Vec<i64> = body["items"].as_array().unwrap().iter().map(|m| m["sortOrder"].as_i64().unwrap()).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        let (_, body) = app.get(&format!("/api/projects/{}/media?type=image", id), &token).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        let (status, _) = app.get(&format!("/api/projects/{}/media?type=gif", id), &token).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .post(&format!("/api/projects/{}", id), &token, json!({"title": "Erbil Citadel", "tags": []}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tags"], json!([]));
        assert_eq!(body["media"], json!([]));

        let (status, _) = app.post(&format!("/api/projects/{}/delete", id), &token, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.get(&format!("/api/projects/{}", id), &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project not found");

        // Tags survive their items
        let (_, body) = app.get("/api/tags", &token).await;
        assert_eq!(body["total"], 3);
    }

    #[tokio::test]
    async fn test_missing_title_is_rejected() {
        let app = spawn_app().await;
        let token = app.admin_token().await;
        let (status, _) = app.post("/api/projects", &token, json!({"title": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listing_is_paginated() {
        let app = spawn_app().await;
        let token = app.admin_token().await;
        for i in 0..3 {
            app.post("/api/projects", &token, json!({"title": format!("Project {}", i)})).await;
        }

        let (_, body) = app.get("/api/projects?page=2&page_size=2", &token).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }
}
