//! Search execution / 搜索执行

use sqlx::SqlitePool;

use super::query::{all_ids_sql, exact_term_sql, substring_search_sql, SearchQuery};
use crate::error::AppError;
use crate::models::{ContentKind, Language, TaxonomyKind};

/// Ids of items whose title, any tag or any keyword contains `text`, ignoring case.
///
/// Each id appears once however many of its tags or keywords match.
pub async fn search_ids(pool: &SqlitePool, kind: ContentKind, text: &str) -> Result<Vec<i64>, AppError> {
    let query = SearchQuery::new(text);

    if query.matches_all() {
        let ids = sqlx::query_scalar::<_, i64>(&all_ids_sql(kind)).fetch_all(pool).await?;
        return Ok(ids);
    }

    let (sql, binds) = substring_search_sql(kind);
    let mut statement = sqlx::query_scalar::<_, i64>(&sql);
    for _ in 0..binds {
        statement = statement.bind(query.needle());
    }
    let ids = statement.fetch_all(pool).await?;

    tracing::debug!("Search {} '{}' matched {} items", kind.as_str(), text, ids.len());
    Ok(ids)
}

/// Ids of items linked to a tag or keyword named exactly `term`, ignoring case.
///
/// `language` selects one per-language set; `None` means the language-neutral set.
pub async fn find_ids_by_term(
    pool: &SqlitePool,
    kind: ContentKind,
    taxonomy: TaxonomyKind,
    language: Option<Language>,
    term: &str,
) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>(&exact_term_sql(kind, taxonomy))
        .bind(language.map(|l| l.code()).unwrap_or(""))
        .bind(term.trim().to_lowercase())
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
