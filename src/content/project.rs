//! Project store / 项目

use sqlx::{SqliteConnection, SqlitePool};

use super::{link_terms, load_term_names, paging, unlink_all};
use crate::audit::Audit;
use crate::error::AppError;
use crate::media;
use crate::models::{ContentKind, Page, Project, ProjectInput, TaxonomyKind};
use crate::search;

const KIND: ContentKind = ContentKind::Project;

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    title: String,
    description: Option<String>,
    location: Option<String>,
    project_date: Option<String>,
    created_at: String,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
}

fn validate(input: &ProjectInput) -> Result<(), AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Project title is required".to_string()));
    }
    Ok(())
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Project>, AppError> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, title, description, location, project_date, created_at, updated_at, created_by, updated_by
         FROM projects WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let tags = load_term_names(conn, KIND, row.id, TaxonomyKind::Tag, None).await?;
    let keywords = load_term_names(conn, KIND, row.id, TaxonomyKind::Keyword, None).await?;
    let media = media::list_ordered(conn, KIND, row.id).await?;

    Ok(Some(Project {
        id: row.id,
        title: row.title,
        description: row.description,
        location: row.location,
        project_date: row.project_date,
        tags,
        keywords,
        media,
        audit: Audit {
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        },
    }))
}

async fn fetch_many(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Project>, AppError> {
    let mut conn = pool.acquire().await?;
    let mut projects = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(project) = fetch(&mut conn, id).await? {
            projects.push(project);
        }
    }
    Ok(projects)
}

async fn write_children(conn: &mut SqliteConnection, id: i64, input: &ProjectInput) -> Result<(), AppError> {
    link_terms(conn, KIND, id, TaxonomyKind::Tag, None, &input.tags).await?;
    link_terms(conn, KIND, id, TaxonomyKind::Keyword, None, &input.keywords).await?;
    media::replace(conn, KIND, id, &input.media).await?;
    Ok(())
}

pub async fn create(pool: &SqlitePool, input: &ProjectInput, actor: Option<&str>) -> Result<Project, AppError> {
    validate(input)?;
    let audit = Audit::created(actor);
    let title = input.title.trim();

    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO projects (title, title_lower, description, location, project_date,
                               created_at, updated_at, created_by, updated_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(title)
    .bind(title.to_lowercase())
    .bind(&input.description)
    .bind(&input.location)
    .bind(&input.project_date)
    .bind(&audit.created_at)
    .bind(&audit.updated_at)
    .bind(&audit.created_by)
    .bind(&audit.updated_by)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    write_children(&mut tx, id, input).await?;
    let project = fetch(&mut tx, id).await?.ok_or(AppError::NotFound("Project"))?;
    tx.commit().await?;

    tracing::info!("Created project {} '{}'", id, project.title);
    Ok(project)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Project>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

/// Replace fields, links and media. `None` when the project does not exist.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    input: &ProjectInput,
    actor: Option<&str>,
) -> Result<Option<Project>, AppError> {
    validate(input)?;
    let mut tx = pool.begin().await?;

    let Some(existing) = fetch(&mut tx, id).await? else {
        return Ok(None);
    };
    let mut audit = existing.audit;
    audit.touch(actor);
    let title = input.title.trim();

    sqlx::query(
        "UPDATE projects SET title = ?, title_lower = ?, description = ?, location = ?, project_date = ?,
                             updated_at = ?, updated_by = ?
         WHERE id = ?"
    )
    .bind(title)
    .bind(title.to_lowercase())
    .bind(&input.description)
    .bind(&input.location)
    .bind(&input.project_date)
    .bind(&audit.updated_at)
    .bind(&audit.updated_by)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    unlink_all(&mut tx, KIND, id).await?;
    write_children(&mut tx, id, input).await?;
    let project = fetch(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("Updated project {}", id);
    Ok(project)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    super::delete_item(pool, KIND, id).await
}

pub async fn list(pool: &SqlitePool, page: i64, page_size: i64) -> Result<Page<Project>, AppError> {
    let (page, page_size, offset) = paging(page, page_size);

    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM projects ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    )
    .bind(page_size)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(pool)
        .await?;

    Ok(Page::new(fetch_many(pool, &ids).await?, total, page, page_size))
}

/// Projects whose title, a tag or a keyword contains `text` (case-insensitive)
pub async fn search(pool: &SqlitePool, text: &str) -> Result<Vec<Project>, AppError> {
    let ids = search::search_ids(pool, KIND, text).await?;
    fetch_many(pool, &ids).await
}

pub async fn find_by_tag(pool: &SqlitePool, name: &str) -> Result<Vec<Project>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Tag, None, name).await?;
    fetch_many(pool, &ids).await
}

pub async fn find_by_keyword(pool: &SqlitePool, name: &str) -> Result<Vec<Project>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Keyword, None, name).await?;
    fetch_many(pool, &ids).await
}
