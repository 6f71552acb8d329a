//! Content item stores / 内容存储
//!
//! One module per domain (projects, writings, news). Every mutation runs in a
//! single transaction so an item, its taxonomy links and its media change together.

pub mod bilingual;
pub mod news;
pub mod project;
pub mod writing;

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppError;
use crate::media;
use crate::models::{ContentKind, Language, Media, MediaType, TaxonomyKind};
use crate::taxonomy;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamp paging input; returns (page, page_size, offset)
pub fn paging(page: i64, page_size: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let page_size = if page_size < 1 { DEFAULT_PAGE_SIZE } else { page_size.min(MAX_PAGE_SIZE) };
    (page, page_size, (page - 1) * page_size)
}

/// Resolve `names` and link them to the item
pub(crate) async fn link_terms(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    item_id: i64,
    taxonomy_kind: TaxonomyKind,
    language: Option<Language>,
    names: &[String],
) -> Result<(), AppError> {
    let terms = taxonomy::resolve(conn, taxonomy_kind, names).await?;
    let sql = format!(
        "INSERT OR IGNORE INTO {} (item_kind, item_id, term_id, language) VALUES (?, ?, ?, ?)",
        taxonomy_kind.link_table()
    );
    for term in terms {
        sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(item_id)
            .bind(term.id)
            .bind(language.map(|l| l.code()).unwrap_or(""))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Names linked to the item, sorted
pub(crate) async fn load_term_names(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    item_id: i64,
    taxonomy_kind: TaxonomyKind,
    language: Option<Language>,
) -> Result<Vec<String>, AppError> {
    let sql = format!(
        "SELECT t.name FROM {link} l JOIN {terms} t ON t.id = l.term_id
         WHERE l.item_kind = ? AND l.item_id = ? AND l.language = ?
         ORDER BY t.name",
        link = taxonomy_kind.link_table(),
        terms = taxonomy_kind.table(),
    );
    let names = sqlx::query_scalar::<_, String>(&sql)
        .bind(kind.as_str())
        .bind(item_id)
        .bind(language.map(|l| l.code()).unwrap_or(""))
        .fetch_all(&mut *conn)
        .await?;
    Ok(names)
}

/// Drop every tag and keyword link of the item; the terms themselves stay
pub(crate) async fn unlink_all(conn: &mut SqliteConnection, kind: ContentKind, item_id: i64) -> Result<(), AppError> {
    for taxonomy_kind in [TaxonomyKind::Tag, TaxonomyKind::Keyword] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE item_kind = ? AND item_id = ?",
            taxonomy_kind.link_table()
        ))
        .bind(kind.as_str())
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn exists(conn: &mut SqliteConnection, kind: ContentKind, item_id: i64) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE id = ?", kind.table()))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Delete an item together with its media and taxonomy links
pub async fn delete_item(pool: &SqlitePool, kind: ContentKind, item_id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.table()))
        .bind(item_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Ok(false);
    }

    let media_removed = media::delete_by_owner(&mut tx, kind, item_id).await?;
    unlink_all(&mut tx, kind, item_id).await?;
    tx.commit().await?;

    tracing::info!("Deleted {} {} ({} media)", kind.as_str(), item_id, media_removed);
    Ok(true)
}

/// Ordered media of an existing item, optionally narrowed to one type.
/// `None` when the item does not exist.
pub async fn item_media(
    pool: &SqlitePool,
    kind: ContentKind,
    item_id: i64,
    media_type: Option<MediaType>,
) -> Result<Option<Vec<Media>>, AppError> {
    let mut conn = pool.acquire().await?;
    if !exists(&mut conn, kind, item_id).await? {
        return Ok(None);
    }

    let all = media::list_ordered(&mut conn, kind, item_id).await?;
    Ok(Some(match media_type {
        Some(media_type) => media::filter_by_type(&all, media_type),
        None => all,
    }))
}
