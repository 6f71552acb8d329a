//! Tag and keyword store / 标签与关键词
//!
//! Names are unique by exact (case-sensitive) value. A lowercased shadow column
//! backs the case-insensitive lookups used by search.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppError;
use crate::models::{TaxonomyKind, Term};

/// Trim, drop empties and collapse duplicates while keeping first-seen order
pub fn normalize_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Resolve names to records, creating the missing ones (exact match) / 查找或创建
pub async fn resolve(
    conn: &mut SqliteConnection,
    kind: TaxonomyKind,
    names: &[String],
) -> Result<Vec<Term>, AppError> {
    let table = kind.table();
    let mut terms = Vec::new();

    for name in normalize_names(names) {
        let existing = sqlx::query_as::<_, Term>(&format!("SELECT id, name FROM {table} WHERE name = ?"))
            .bind(&name)
            .fetch_optional(&mut *conn)
            .await?;

        let term = match existing {
            Some(term) => term,
            None => {
                let id = sqlx::query(&format!(
                    "INSERT INTO {table} (name, name_lower, created_at) VALUES (?, ?, ?)"
                ))
                .bind(&name)
                .bind(name.to_lowercase())
                .bind(Utc::now().to_rfc3339())
                .execute(&mut *conn)
                .await?
                .last_insert_rowid();
                tracing::debug!("Created {} '{}' ({})", kind.label(), name, id);
                Term { id, name }
            }
        };
        terms.push(term);
    }

    Ok(terms)
}

/// Insert a new record; an existing exact name is a conflict
pub async fn create(pool: &SqlitePool, kind: TaxonomyKind, name: &str) -> Result<Term, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!("{} name is required", kind.label())));
    }

    let result = sqlx::query(&format!(
        "INSERT INTO {} (name, name_lower, created_at) VALUES (?, ?, ?)",
        kind.table()
    ))
    .bind(name)
    .bind(name.to_lowercase())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict(format!("{} '{}' already exists", kind.label(), name)),
        other => other,
    })?;

    Ok(Term { id: result.last_insert_rowid(), name: name.to_string() })
}

pub async fn find_by_id(pool: &SqlitePool, kind: TaxonomyKind, id: i64) -> Result<Option<Term>, AppError> {
    let term = sqlx::query_as::<_, Term>(&format!("SELECT id, name FROM {} WHERE id = ?", kind.table()))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(term)
}

/// All records whose name equals `name` ignoring case ("History" and "history" both match)
pub async fn find_by_name_ignore_case(
    pool: &SqlitePool,
    kind: TaxonomyKind,
    name: &str,
) -> Result<Vec<Term>, AppError> {
    let terms = sqlx::query_as::<_, Term>(&format!(
        "SELECT id, name FROM {} WHERE name_lower = ? ORDER BY id",
        kind.table()
    ))
    .bind(name.trim().to_lowercase())
    .fetch_all(pool)
    .await?;
    Ok(terms)
}

/// Records whose exact name is in `names`
pub async fn find_in(pool: &SqlitePool, kind: TaxonomyKind, names: &[String]) -> Result<Vec<Term>, AppError> {
    let names = normalize_names(names);
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "SELECT id, name FROM {} WHERE name IN ({}) ORDER BY name",
        kind.table(),
        placeholders
    );
    let mut query = sqlx::query_as::<_, Term>(&sql);
    for name in &names {
        query = query.bind(name);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn list(pool: &SqlitePool, kind: TaxonomyKind) -> Result<Vec<Term>, AppError> {
    let terms = sqlx::query_as::<_, Term>(&format!("SELECT id, name FROM {} ORDER BY name, id", kind.table()))
        .fetch_all(pool)
        .await?;
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> SqlitePool {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_names() {
        assert_eq!(
            normalize_names(&names(&[" history ", "", "history", "Art"])),
            names(&["history", "Art"])
        );
    }

    #[tokio::test]
    async fn test_resolve_reuses_existing() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = resolve(&mut conn, TaxonomyKind::Tag, &names(&["history", "music"])).await.unwrap();
        let second = resolve(&mut conn, TaxonomyKind::Tag, &names(&["music", "poetry"])).await.unwrap();
        drop(conn);

        assert_eq!(first[1], second[0]);
        assert_eq!(list(&pool, TaxonomyKind::Tag).await.unwrap().len(), 3);
        // Keywords are a separate namespace
        assert!(list(&pool, TaxonomyKind::Keyword).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_exact_name_conflicts() {
        let pool = setup().await;
        create(&pool, TaxonomyKind::Tag, "History").await.unwrap();
        create(&pool, TaxonomyKind::Tag, "history").await.unwrap();

        let err = create(&pool, TaxonomyKind::Tag, "History").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Same name in the other namespace is fine
        create(&pool, TaxonomyKind::Keyword, "History").await.unwrap();
    }

    #[tokio::test]
    async fn test_lookups() {
        let pool = setup().await;
        let history = create(&pool, TaxonomyKind::Tag, "History").await.unwrap();
        create(&pool, TaxonomyKind::Tag, "history").await.unwrap();
        create(&pool, TaxonomyKind::Tag, "Art").await.unwrap();

        assert_eq!(find_by_name_ignore_case(&pool, TaxonomyKind::Tag, "HISTORY").await.unwrap().len(), 2);
        assert_eq!(find_by_id(&pool, TaxonomyKind::Tag, history.id).await.unwrap(), Some(history));
        assert_eq!(find_by_id(&pool, TaxonomyKind::Tag, 999).await.unwrap(), None);

        let found = find_in(&pool, TaxonomyKind::Tag, &names(&["Art", "History", "missing"])).await.unwrap();
        let found: Vec<_> = found.into_iter().map(|t| t.name).collect();
        assert_eq!(found, names(&["Art", "History"]));
    }

    #[tokio::test]
    async fn test_create_rejects_blank() {
        let pool = setup().await;
        let err = create(&pool, TaxonomyKind::Keyword, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
