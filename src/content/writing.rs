//! Writing (book) store / 著作
//!
//! Tags and keywords are kept per language; the CKB and KMR sets are independent.

use sqlx::{SqliteConnection, SqlitePool};

use super::bilingual;
use super::{link_terms, load_term_names, paging, unlink_all};
use crate::audit::Audit;
use crate::error::AppError;
use crate::media;
use crate::models::{ContentKind, Language, Page, TaxonomyKind, Writing, WritingInput};
use crate::search;

const KIND: ContentKind = ContentKind::Writing;

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Writing>, AppError> {
    let Some(row) = bilingual::fetch_row(conn, KIND, id).await? else {
        return Ok(None);
    };

    let ckb = Some(Language::Ckb);
    let kmr = Some(Language::Kmr);

    Ok(Some(Writing {
        id: row.id,
        ckb: row.ckb(),
        kmr: row.kmr(),
        tags_ckb: load_term_names(conn, KIND, row.id, TaxonomyKind::Tag, ckb).await?,
        tags_kmr: load_term_names(conn, KIND, row.id, TaxonomyKind::Tag, kmr).await?,
        keywords_ckb: load_term_names(conn, KIND, row.id, TaxonomyKind::Keyword, ckb).await?,
        keywords_kmr: load_term_names(conn, KIND, row.id, TaxonomyKind::Keyword, kmr).await?,
        media: media::list_ordered(conn, KIND, row.id).await?,
        audit: row.audit(),
    }))
}

async fn fetch_many(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Writing>, AppError> {
    let mut conn = pool.acquire().await?;
    let mut writings = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(writing) = fetch(&mut conn, id).await? {
            writings.push(writing);
        }
    }
    Ok(writings)
}

async fn write_children(conn: &mut SqliteConnection, id: i64, input: &WritingInput) -> Result<(), AppError> {
    let ckb = Some(Language::Ckb);
    let kmr = Some(Language::Kmr);
    link_terms(conn, KIND, id, TaxonomyKind::Tag, ckb, &input.tags_ckb).await?;
    link_terms(conn, KIND, id, TaxonomyKind::Tag, kmr, &input.tags_kmr).await?;
    link_terms(conn, KIND, id, TaxonomyKind::Keyword, ckb, &input.keywords_ckb).await?;
    link_terms(conn, KIND, id, TaxonomyKind::Keyword, kmr, &input.keywords_kmr).await?;
    media::replace(conn, KIND, id, &input.media).await?;
    Ok(())
}

pub async fn create(pool: &SqlitePool, input: &WritingInput, actor: Option<&str>) -> Result<Writing, AppError> {
    bilingual::validate(KIND, &input.ckb, &input.kmr)?;
    let audit = Audit::created(actor);

    let mut tx = pool.begin().await?;
    let id = bilingual::insert(&mut tx, KIND, &input.ckb, &input.kmr, &audit).await?;
    write_children(&mut tx, id, input).await?;
    let writing = fetch(&mut tx, id).await?.ok_or(AppError::NotFound("Writing"))?;
    tx.commit().await?;

    tracing::info!("Created writing {}", id);
    Ok(writing)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Writing>, AppError> {
    let mut conn = pool.acquire().await?;
    fetch(&mut conn, id).await
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    input: &WritingInput,
    actor: Option<&str>,
) -> Result<Option<Writing>, AppError> {
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
    let writing = fetch(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("Updated writing {}", id);
    Ok(writing)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    super::delete_item(pool, KIND, id).await
}

pub async fn list(pool: &SqlitePool, page: i64, page_size: i64) -> Result<Page<Writing>, AppError> {
    let (page, page_size, offset) = paging(page, page_size);
    let (ids, total) = {
        let mut conn = pool.acquire().await?;
        bilingual::page_ids(&mut conn, KIND, page_size, offset).await?
    };
    Ok(Page::new(fetch_many(pool, &ids).await?, total, page, page_size))
}

/// Writings whose title (either language), a tag or a keyword contains `text`
pub async fn search(pool: &SqlitePool, text: &str) -> Result<Vec<Writing>, AppError> {
    let ids = search::search_ids(pool, KIND, text).await?;
    fetch_many(pool, &ids).await
}

/// Writings whose tag set for `language` holds `name` exactly (case-insensitive)
pub async fn find_by_tag(pool: &SqlitePool, language: Language, name: &str) -> Result<Vec<Writing>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Tag, Some(language), name).await?;
    fetch_many(pool, &ids).await
}

/// Writings whose keyword set for `language` holds `name` exactly (case-insensitive)
pub async fn find_by_keyword(pool: &SqlitePool, language: Language, name: &str) -> Result<Vec<Writing>, AppError> {
    let ids = search::find_ids_by_term(pool, KIND, TaxonomyKind::Keyword, Some(language), name).await?;
    fetch_many(pool, &ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::LocalizedContent;

    async fn setup() -> SqlitePool {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn input() -> WritingInput {
        WritingInput {
            ckb: Some(LocalizedContent {
                title: "مەم و زین".to_string(),
                description: None,
                author: Some("ئەحمەدی خانی".to_string()),
            }),
            kmr: Some(LocalizedContent {
                title: "Mem û Zîn".to_string(),
                description: Some("Destan".to_string()),
                author: Some("Ehmedê Xanî".to_string()),
            }),
            tags_ckb: strings(&["kurdistan", "poetry"]),
            tags_kmr: strings(&["Helbest"]),
            keywords_ckb: strings(&["classic"]),
            keywords_kmr: strings(&["Klasîk"]),
            media: vec![],
        }
    }

    #[tokio::test]
    async fn test_round_trip_language_sets() {
        let pool = setup().await;
        let created = create(&pool, &input(), Some("admin")).await.unwrap();

        let loaded = get(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(loaded.kmr.unwrap().title, "Mem û Zîn");
        assert_eq!(loaded.tags_ckb, vec!["kurdistan", "poetry"]);
        assert_eq!(loaded.tags_kmr, vec!["Helbest"]);
        assert_eq!(loaded.keywords_kmr, vec!["Klasîk"]);
    }

    #[tokio::test]
    async fn test_find_by_tag_per_language() {
        let pool = setup().await;
        let mut only_ckb = input();
        only_ckb.tags_kmr.clear();
        let created = create(&pool, &only_ckb, None).await.unwrap();

        let ckb = find_by_tag(&pool, Language::Ckb, "Kurdistan").await.unwrap();
        let kmr = find_by_tag(&pool, Language::Kmr, "kurdistan").await.unwrap();
        assert_eq!(ckb.iter().map(|w| w.id).collect::<Vec<_>>(), vec![created.id]);
        assert!(kmr.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_keyword_per_language() {
        let pool = setup().await;
        let created = create(&pool, &input(), None).await.unwrap();

        assert_eq!(find_by_keyword(&pool, Language::Kmr, "KLASÎK").await.unwrap()[0].id, created.id);
        assert!(find_by_keyword(&pool, Language::Ckb, "klasîk").await.unwrap().is_empty());
        assert!(find_by_keyword(&pool, Language::Ckb, "class").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_either_title() {
        let pool = setup().await;
        let created = create(&pool, &input(), None).await.unwrap();

        assert_eq!(search(&pool, "mem û").await.unwrap()[0].id, created.id);
        assert_eq!(search(&pool, "زین").await.unwrap()[0].id, created.id);
        assert_eq!(search(&pool, "helb").await.unwrap()[0].id, created.id);
        assert!(search(&pool, "nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requires_one_language() {
        let pool = setup().await;
        let mut empty = input();
        empty.ckb = None;
        empty.kmr = None;
        assert!(matches!(create(&pool, &empty, None).await.unwrap_err(), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_moves_tags_between_languages() {
        let pool = setup().await;
        let created = create(&pool, &input(), None).await.unwrap();

        let mut next = input();
        next.tags_kmr = strings(&["kurdistan"]);
        next.tags_ckb.clear();
        update(&pool, created.id, &next, Some("editor")).await.unwrap().unwrap();

        assert!(find_by_tag(&pool, Language::Ckb, "kurdistan").await.unwrap().is_empty());
        assert_eq!(find_by_tag(&pool, Language::Kmr, "kurdistan").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let pool = setup().await;
        let first = create(&pool, &input(), None).await.unwrap();
        create(&pool, &input(), None).await.unwrap();

        assert_eq!(list(&pool, 1, 10).await.unwrap().total, 2);
        assert!(delete(&pool, first.id).await.unwrap());
        assert_eq!(list(&pool, 1, 10).await.unwrap().total, 1);
    }
}
