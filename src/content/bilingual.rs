//! Storage shared by the two-language domains (writings, news)

use sqlx::SqliteConnection;

use crate::audit::Audit;
use crate::error::AppError;
use crate::models::{ContentKind, LocalizedContent};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BilingualRow {
    pub id: i64,
    pub title_ckb: Option<String>,
    pub description_ckb: Option<String>,
    pub author_ckb: Option<String>,
    pub title_kmr: Option<String>,
    pub description_kmr: Option<String>,
    pub author_kmr: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl BilingualRow {
    pub fn ckb(&self) -> Option<LocalizedContent> {
        block(&self.title_ckb, &self.description_ckb, &self.author_ckb)
    }

    pub fn kmr(&self) -> Option<LocalizedContent> {
        block(&self.title_kmr, &self.description_kmr, &self.author_kmr)
    }

    pub fn audit(&self) -> Audit {
        Audit {
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
        }
    }
}

fn block(title: &Option<String>, description: &Option<String>, author: &Option<String>) -> Option<LocalizedContent> {
    title.as_ref().map(|title| LocalizedContent {
        title: title.clone(),
        description: description.clone(),
        author: author.clone(),
    })
}

/// At least one language block, and every present block needs a title
pub(crate) fn validate(
    kind: ContentKind,
    ckb: &Option<LocalizedContent>,
    kmr: &Option<LocalizedContent>,
) -> Result<(), AppError> {
    if ckb.is_none() && kmr.is_none() {
        return Err(AppError::Validation(format!(
            "{} needs content in at least one language",
            kind.label()
        )));
    }
    for block in [ckb, kmr].into_iter().flatten() {
        if block.title.trim().is_empty() {
            return Err(AppError::Validation(format!("{} title is required", kind.label())));
        }
    }
    Ok(())
}

fn title(block: &Option<LocalizedContent>) -> Option<String> {
    block.as_ref().map(|b| b.title.trim().to_string())
}

fn title_lower(block: &Option<LocalizedContent>) -> Option<String> {
    title(block).map(|t| t.to_lowercase())
}

pub(crate) async fn fetch_row(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    id: i64,
) -> Result<Option<BilingualRow>, AppError> {
    let row = sqlx::query_as::<_, BilingualRow>(&format!(
        "SELECT id, title_ckb, description_ckb, author_ckb, title_kmr, description_kmr, author_kmr,
                created_at, updated_at, created_by, updated_by
         FROM {} WHERE id = ?",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    ckb: &Option<LocalizedContent>,
    kmr: &Option<LocalizedContent>,
    audit: &Audit,
) -> Result<i64, AppError> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (title_ckb, title_ckb_lower, description_ckb, author_ckb,
                         title_kmr, title_kmr_lower, description_kmr, author_kmr,
                         created_at, updated_at, created_by, updated_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        kind.table()
    ))
    .bind(title(ckb))
    .bind(title_lower(ckb))
    .bind(ckb.as_ref().and_then(|b| b.description.clone()))
    .bind(ckb.as_ref().and_then(|b| b.author.clone()))
    .bind(title(kmr))
    .bind(title_lower(kmr))
    .bind(kmr.as_ref().and_then(|b| b.description.clone()))
    .bind(kmr.as_ref().and_then(|b| b.author.clone()))
    .bind(&audit.created_at)
    .bind(&audit.updated_at)
    .bind(&audit.created_by)
    .bind(&audit.updated_by)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn update(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    id: i64,
    ckb: &Option<LocalizedContent>,
    kmr: &Option<LocalizedContent>,
    audit: &Audit,
) -> Result<(), AppError> {
    sqlx::query(&format!(
        "UPDATE {} SET title_ckb = ?, title_ckb_lower = ?, description_ckb = ?, author_ckb = ?,
                       title_kmr = ?, title_kmr_lower = ?, description_kmr = ?, author_kmr = ?,
                       updated_at = ?, updated_by = ?
         WHERE id = ?",
        kind.table()
    ))
    .bind(title(ckb))
    .bind(title_lower(ckb))
    .bind(ckb.as_ref().and_then(|b| b.description.clone()))
    .bind(ckb.as_ref().and_then(|b| b.author.clone()))
    .bind(title(kmr))
    .bind(title_lower(kmr))
    .bind(kmr.as_ref().and_then(|b| b.description.clone()))
    .bind(kmr.as_ref().and_then(|b| b.author.clone()))
    .bind(&audit.updated_at)
    .bind(&audit.updated_by)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Ids of the newest items first, for listings
pub(crate) async fn page_ids(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    limit: i64,
    offset: i64,
) -> Result<(Vec<i64>, i64), AppError> {
    let ids = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT id FROM {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        kind.table()
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
        .fetch_one(&mut *conn)
        .await?;

    Ok((ids, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(title: &str) -> Option<LocalizedContent> {
        Some(LocalizedContent { title: title.to_string(), description: None, author: None })
    }

    #[test]
    fn test_validate_requires_a_language() {
        assert!(validate(ContentKind::News, &None, &None).is_err());
        assert!(validate(ContentKind::News, &content("Nûçe"), &None).is_ok());
        assert!(validate(ContentKind::Writing, &None, &content("  ")).is_err());
    }

    #[test]
    fn test_row_blocks() {
        let row = BilingualRow {
            id: 1,
            title_ckb: Some("کتێب".to_string()),
            description_ckb: None,
            author_ckb: Some("Hejar".to_string()),
            title_kmr: None,
            description_kmr: Some("orphaned".to_string()),
            author_kmr: None,
            created_at: "t0".to_string(),
            updated_at: "t1".to_string(),
            created_by: None,
            updated_by: None,
        };
        assert_eq!(row.ckb().unwrap().author.as_deref(), Some("Hejar"));
        assert!(row.kmr().is_none());
        assert_eq!(row.audit().updated_at, "t1");
    }
}
