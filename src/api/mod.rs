pub mod auth;
pub mod news;
pub mod projects;
pub mod server;
pub mod taxonomy;
pub mod users;
pub mod writings;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use archive_cms::content::DEFAULT_PAGE_SIZE;
use archive_cms::error::AppError;
use archive_cms::models::MediaType;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub search: Option<String>,
}

fn default_page() -> i64 { 1 }
fn default_page_size() -> i64 { DEFAULT_PAGE_SIZE }

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

impl MediaQuery {
    /// Optional type filter; an unknown type is a client error
    pub fn media_type(&self) -> Result<Option<MediaType>, AppError> {
        match self.media_type.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(AppError::Validation),
        }
    }
}

/// Build the API router / 构建路由
///
/// Everything except `/api/health` sits behind [`crate::auth::require_auth`],
/// which lets the public auth routes through.
pub fn router(state: Arc<AppState>) -> Router {
    let guarded = Router::new()
        .route("/api/auth/admin/register", post(auth::register))
        .route("/api/auth/admin/login", post(auth::login))
        .route("/api/auth/admin/reset-password", post(auth::reset_password))
        .route("/api/auth/admin/logout", post(auth::logout))
        .route("/api/auth/admin/me", get(auth::get_current_user))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/:id", get(users::get_user).post(users::update_user))
        .route("/api/users/:id/delete", post(users::delete_user))
        .route("/api/users/:id/reset-code", post(auth::issue_reset_code))
        .route("/api/tags", get(taxonomy::list_tags).post(taxonomy::create_tag))
        .route("/api/keywords", get(taxonomy::list_keywords).post(taxonomy::create_keyword))
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route("/api/projects/search", get(projects::search_projects))
        .route("/api/projects/by-tag/:name", get(projects::projects_by_tag))
        .route("/api/projects/by-keyword/:name", get(projects::projects_by_keyword))
        .route("/api/projects/:id", get(projects::get_project).post(projects::update_project))
        .route("/api/projects/:id/delete", post(projects::delete_project))
        .route("/api/projects/:id/media", get(projects::project_media))
        .route("/api/writings", get(writings::list_writings).post(writings::create_writing))
        .route("/api/writings/search", get(writings::search_writings))
        .route("/api/writings/by-tag/:language/:name", get(writings::writings_by_tag))
        .route("/api/writings/by-keyword/:language/:name", get(writings::writings_by_keyword))
        .route("/api/writings/:id", get(writings::get_writing).post(writings::update_writing))
        .route("/api/writings/:id/delete", post(writings::delete_writing))
        .route("/api/writings/:id/media", get(writings::writing_media))
        .route("/api/news", get(news::list_news).post(news::create_news))
        .route("/api/news/search", get(news::search_news))
        .route("/api/news/by-tag/:name", get(news::news_by_tag))
        .route("/api/news/by-keyword/:name", get(news::news_by_keyword))
        .route("/api/news/:id", get(news::get_news).post(news::update_news))
        .route("/api/news/:id/delete", post(news::delete_news))
        .route("/api/news/:id/media", get(news::news_media))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_auth));

    Router::new()
        .route("/api/health", get(server::health_check))
        .merge(guarded)
        .with_state(state)
}
