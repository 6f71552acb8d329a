//! News store / 新闻

use sqlx::{SqliteConnection, SqlitePool};

use super::bilingual;
use super::{link_terms, load_term_names, paging, unlink_all};
use crate::audit::Audit;
use crate::error::AppError;
use crate::media;
use crate::models::{ContentKind, News, NewsInput, Page, TaxonomyKind};
use crate::search;

const KIND: ContentKind = ContentKind::News;

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<News>, AppError> {
    let Some(row) = bilingual::fetch_row(conn, KIND, id).await? else {
        return Ok(None);
    };

    Ok(Some(News {
        id: row.id,
        ckb: row.ckb(),
        kmr: row.kmr(),
        tags: load_term_names(conn, KIND, row.id, TaxonomyKind::Tag, None).await?,
        keywords: load_term_names(conn, KIND, row.id, TaxonomyKind::Keyword, None).await?,
        media: media::list_ordered(conn, KIND, row.id).await?,
        audit: row.audit(),
    }))
}

async fn fetch_many(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<News>, AppError> {
    let mut conn = pool.acquire().await?;
    let mut items = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(news) = fetch(&mut conn, id).await? {
            items.push(news);
        }
    }
    Ok(items)
}

async fn write_children(conn: &mut SqliteConnection, id: i64, input: &NewsInput) -> Result<(), AppError> {
    link_terms(conn, KIND, id, TaxonomyKind::Tag, None, &input.tags).await?;
    link_terms(conn, KIND, id, TaxonomyKind::Keyword, None, &input.keywords).await?;
    media::replace(conn, KIND, id, &input.media).await?;
    Ok(())
}

pub async fn create(pool: &SqlitePool, input: &NewsInput, actor: Option<&str>) -> Result<News, AppError> {
    bilingual::validate(KIND, &input.ckb, &input.kmr)?;
    let audit = Audit::created(actor);

    let mut tx = pool.begin().await?;
    let id = bilingual::insert(&mut tx, KIND, &input.ckb, &input.kmr, &audit).await?;
    write_children(&mut tx, id, input).await?;
    let news = fetch(&mut tx, id).await?.ok_or(AppError::NotFound("News"))?;
    tx.commit().await?;

    tracing::info!("Created news {}", id);
    Ok(news)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<News>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    input: &NewsInput,
    actor: Option<&str>,
) -> Result<Option<News>, AppError> {
    bilingual::validate(KIND, &input.ckb, &input.kmr)?;
    let mut tx = pool.begin().await?;

    let Some(row) = bilingual::fetch_row(&mut tx, KIND, id).await? else {
        return Ok(None);
    };
    let mut audit = row.audit();
    audit.touch(actor);

    bilingual::update(&mut tx, KIND, id, &input.ckb, &input.kmr, &audit).await?;
    unlink_all(&mut tx, KIND, id).await?;
    write_children(&mut tx, id, input).await?;
    let news = fetch(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("Updated news {}", id);
    Ok(news)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    super::delete_item(pool, KIND, id).await
}

pub async fn list(pool: &SqlitePool, page: i64, page_size: i64) -> Result<Page<News>, AppError> {
    let (page, page_size, offset) = paging(page, page_size);
    let (ids, total) = {
        let mut conn = pool.acquire().await?;
        bilingual::page_ids(&mut conn, KIND, page_size, offset).await?
    };
    Ok(Page::new(fetch_many(pool, &ids).await?, total, page, page_size))
}

pub async fn search(pool: &SqlitePool, text: &str) -> Result<Vec<News>, AppError> {
    let ids = search::search_ids(pool, KIND, text).await?;
    fetch_many(pool, &ids).await
}

pub async fn find_by_tag(pool: &SqlitePool, name: &str) -> Result<Vec<News>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Tag, None, name).await?;
    fetch_many(pool, &ids).await
}

pub async fn find_by_keyword(pool: &SqlitePool, name: &str) -> Result<Vec<News>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Keyword, None, name).await?;
    fetch_many(pool, &ids).await
}
