//! Ordered media owned by a content item / 内容附件
//!
//! Every row belongs to exactly one `(item_kind, item_id)` owner and is removed with it.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::AppError;
use crate::models::{ContentKind, Media, MediaInput, MediaType};

type MediaRow = (i64, String, String, Option<String>, i64);

fn from_row((id, media_type, url, caption, sort_order): MediaRow) -> Result<Media, AppError> {
    let media_type = media_type.parse::<MediaType>().map_err(AppError::Internal)?;
    Ok(Media { id, media_type, url, caption, sort_order })
}

/// Media of one item in ascending sort order (ties broken by id)
pub async fn list_ordered(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    item_id: i64,
) -> Result<Vec<Media>, AppError> {
    let rows = sqlx::query_as::<_, MediaRow>(
        "SELECT id, media_type, url, caption, sort_order FROM media
         WHERE item_kind = ? AND item_id = ?
         ORDER BY sort_order ASC, id ASC"
    )
    .bind(kind.as_str())
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(from_row).collect()
}

/// Keep only media of the given type, preserving order
pub fn filter_by_type(media: &[Media], media_type: MediaType) -> Vec<Media> {
    media.iter().filter(|m| m.media_type == media_type).cloned().collect()
}

/// Remove every media row owned by the item; returns the number removed
pub async fn delete_by_owner(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    item_id: i64,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM media WHERE item_kind = ? AND item_id = ?")
        .bind(kind.as_str())
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Stored url for an input. A bare file name is placed under its type's storage prefix;
/// anything with a path or scheme is kept as given.
pub fn storage_path(media_type: MediaType, url: &str) -> String {
    let url = url.trim();
    if url.contains('/') {
        url.to_string()
    } else {
        format!("{}{}", media_type.storage_prefix(), url)
    }
}

/// Replace the item's media set. A missing sort order falls back to the list position.
pub async fn replace(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    item_id: i64,
    inputs: &[MediaInput],
) -> Result<(), AppError> {
    if let Some(bad) = inputs.iter().position(|m| m.url.trim().is_empty()) {
        return Err(AppError::Validation(format!("Media #{} has an empty url", bad)));
    }

    delete_by_owner(conn, kind, item_id).await?;

    let now = Utc::now().to_rfc3339();
    for (index, input) in inputs.iter().enumerate() {
        sqlx::query(
            "INSERT INTO media (item_kind, item_id, media_type, url, caption, sort_order, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(kind.as_str())
        .bind(item_id)
        .bind(input.media_type.as_str())
        .bind(storage_path(input.media_type, &input.url))
        .bind(&input.caption)
        .bind(input.sort_order.unwrap_or(index as i64))
        .bind(&now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::SqlitePool;

    async fn setup() -> SqlitePool {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn input(media_type: MediaType, url: &str, sort_order: Option<i64>) -> MediaInput {
        MediaInput { media_type, url: url.to_string(), caption: None, sort_order }
    }

    #[tokio::test]
    async fn test_ordered_by_sort_key() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let inputs = vec![
            input(MediaType::Image, "images/c.jpg", Some(2)),
            input(MediaType::Image, "images/a.jpg", Some(0)),
            input(MediaType::Video, "videos/b.mp4", Some(1)),
        ];
        replace(&mut conn, ContentKind::Project, 1, &inputs).await.unwrap();

        let media = list_ordered(&mut conn, ContentKind::Project, 1).await.unwrap();
        let orders: Vec<i64> = media.iter().map(|m| m.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(media[0].url, "images/a.jpg");
    }

    #[tokio::test]
    async fn test_default_sort_order_is_position() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let inputs = vec![
            input(MediaType::Pdf, "pdfs/one.pdf", None),
            input(MediaType::Text, "texts/two.txt", None),
        ];
        replace(&mut conn, ContentKind::Writing, 7, &inputs).await.unwrap();

        let media = list_ordered(&mut conn, ContentKind::Writing, 7).await.unwrap();
        assert_eq!(media[0].url, "pdfs/one.pdf");
        assert_eq!(media[1].sort_order, 1);
    }

    #[tokio::test]
    async fn test_delete_scoped_to_owner() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        replace(&mut conn, ContentKind::News, 1, &[input(MediaType::Image, "images/1.jpg", None)]).await.unwrap();
        replace(&mut conn, ContentKind::News, 2, &[input(MediaType::Image, "images/2.jpg", None)]).await.unwrap();
        // Same id under another kind is a different owner
        replace(&mut conn, ContentKind::Project, 1, &[input(MediaType::Image, "images/p.jpg", None)]).await.unwrap();

        assert_eq!(delete_by_owner(&mut conn, ContentKind::News, 1).await.unwrap(), 1);
        assert!(list_ordered(&mut conn, ContentKind::News, 1).await.unwrap().is_empty());
        assert_eq!(list_ordered(&mut conn, ContentKind::News, 2).await.unwrap().len(), 1);
        assert_eq!(list_ordered(&mut conn, ContentKind::Project, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_rejects_empty_url() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let err = replace(&mut conn, ContentKind::Project, 1, &[input(MediaType::Audio, " ", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bare_file_name_gets_storage_prefix() {
        let pool = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let inputs = vec![
            input(MediaType::Audio, " stran.mp3 ", None),
            input(MediaType::Image, "https://cdn.example.org/x.jpg", None),
        ];
        replace(&mut conn, ContentKind::Project, 3, &inputs).await.unwrap();

        let media = list_ordered(&mut conn, ContentKind::Project, 3).await.unwrap();
        assert_eq!(media[0].url, "audios/stran.mp3");
        assert_eq!(media[1].url, "https://cdn.example.org/x.jpg");
        assert_eq!(storage_path(MediaType::Pdf, "pdfs/a.pdf"), "pdfs/a.pdf");
    }

    #[test]
    fn test_filter_by_type() {
        let media = vec![
            Media { id: 1, media_type: MediaType::Image, url: "a".into(), caption: None, sort_order: 0 },
            Media { id: 2, media_type: MediaType::Pdf, url: "b".into(), caption: None, sort_order: 1 },
            Media { id: 3, media_type: MediaType::Image, url: "c".into(), caption: None, sort_order: 2 },
        ];
        let images = filter_by_type(&media, MediaType::Image);
        assert_eq!(images.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 3]);
    }
}
