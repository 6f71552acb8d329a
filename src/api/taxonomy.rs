use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use archive_cms::error::AppError;
use archive_cms::models::TaxonomyKind;
use archive_cms::taxonomy;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTermRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TermQuery {
    /// Narrow the listing to names equal to this one, ignoring case
    pub name: Option<String>,
}

async fn list_terms(state: &AppState, kind: TaxonomyKind, query: TermQuery) -> Result<Json<Value>, AppError> {
    let terms = match query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => taxonomy::find_by_name_ignore_case(&state.db, kind, name).await?,
        None => taxonomy::list(&state.db, kind).await?,
    };
    Ok(Json(json!({ "items": terms, "total": terms.len() })))
}

async fn create_term(
    state: &AppState,
    kind: TaxonomyKind,
    req: CreateTermRequest,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let term = taxonomy::create(&state.db, kind, &req.name).await?;
    Ok((StatusCode::CREATED, Json(json!(term))))
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TermQuery>,
) -> Result<Json<Value>, AppError> {
    list_terms(&state, TaxonomyKind::Tag, query).await
}

/// POST /api/tags
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTermRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_term(&state, TaxonomyKind::Tag, req).await
}

/// GET /api/keywords
pub async fn list_keywords(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TermQuery>,
) -> Result<Json<Value>, AppError> {
    list_terms(&state, TaxonomyKind::Keyword, query).await
}

/// POST /api/keywords
pub async fn create_keyword(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTermRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_term(&state, TaxonomyKind::Keyword, req).await
}
