use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::security::Role;

/// Generate random password / 生成随机密码
fn generate_random_password(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789!@#$%^&*";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Open a connection pool / 打开数据库连接池
///
/// In-memory databases live per connection, so callers pass `max_connections = 1` for them.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !database_url.contains(":memory:") {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            last_login TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS token_blacklist (
            token_hash TEXT PRIMARY KEY,
            revoked_at TEXT NOT NULL,
            expires_at INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Tags and keywords share a shape but never a namespace
    for table in ["tags", "keywords"] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_lower TEXT NOT NULL,
                created_at TEXT NOT NULL,
                CONSTRAINT uk_{table}_name UNIQUE (name)
            )
            "#
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_name_lower ON {table}(name_lower)"
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            title_lower TEXT NOT NULL,
            description TEXT,
            location TEXT,
            project_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT,
            updated_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Writings and news carry one content block per language
    for table in ["writings", "news"] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title_ckb TEXT,
                title_ckb_lower TEXT,
                description_ckb TEXT,
                author_ckb TEXT,
                title_kmr TEXT,
                title_kmr_lower TEXT,
                description_kmr TEXT,
                author_kmr TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                created_by TEXT,
                updated_by TEXT
            )
            "#
        ))
        .execute(pool)
        .await?;
    }

    // language is '' for language-neutral links
    for (link, target) in [("item_tags", "tags"), ("item_keywords", "keywords")] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {link} (
                item_kind TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                term_id INTEGER NOT NULL,
                language TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (item_kind, item_id, term_id, language),
                FOREIGN KEY (term_id) REFERENCES {target}(id)
            )
            "#
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{link}_term ON {link}(term_id)"
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_kind TEXT NOT NULL,
            item_id INTEGER NOT NULL,
            media_type TEXT NOT NULL,
            url TEXT NOT NULL,
            caption TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_owner ON media(item_kind, item_id, sort_order)"
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database migrations applied");

    Ok(())
}

/// Create the initial super admin when the users table is empty / 初始化超级管理员
///
/// Returns the generated password so it can be shown once.
pub async fn ensure_default_admin(pool: &SqlitePool, bcrypt_cost: u32) -> Result<Option<String>> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count > 0 {
        return Ok(None);
    }

    let password = generate_random_password(16);
    let password_hash = bcrypt::hash(&password, bcrypt_cost)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (username, email, password_hash, role, enabled, created_at, updated_at)
         VALUES ('admin', NULL, ?, ?, 1, ?, ?)"
    )
    .bind(&password_hash)
    .bind(Role::SuperAdmin.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::warn!("Created default super admin 'admin', password: {}", password);

    Ok(Some(password))
}
