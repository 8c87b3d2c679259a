//! Post repository
//!
//! Owns the mapping between rows of the `posts` table and [`Post`] values:
//! - tags are stored as a JSON array in the single `tags` text column
//! - timestamps are stored as `YYYY-MM-DD HH:MM:SS` (UTC) text and parsed
//!   back with that exact pattern; anything else is a hard error
//!
//! Every failure is logged with the operation name and post id before it is
//! returned to the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql_pool, sqlite_pool};
use crate::db::DynDatabasePool;
use crate::models::Post;

/// Storage format of `created_at` / `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_BY_ID: &str =
    "SELECT id, title, content, category, tags, created_at, updated_at FROM posts WHERE id = ?";
const SELECT_ALL: &str =
    "SELECT id, title, content, category, tags, created_at, updated_at FROM posts ORDER BY id";

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new row and return it as stored.
    ///
    /// The id and timestamps of `post` are ignored; storage assigns them.
    async fn create(&self, post: &Post) -> Result<Post>;

    /// `Ok(None)` when no row has this id.
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Every post in ascending id order; empty when the table is empty.
    async fn get_all(&self) -> Result<Vec<Post>>;

    /// Overwrite title, content, category and tags of the row with `post.id`
    /// and refresh its `updated_at`. A missing row is not reported.
    async fn update(&self, post: &Post) -> Result<()>;

    /// Remove the row with this id. A missing row is not reported.
    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn create_row(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite_pool(&self.pool)?, post).await,
            DatabaseDriver::Mysql => create_mysql(mysql_pool(&self.pool)?, post).await,
        }
    }

    async fn fetch_one(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_all_sqlite(sqlite_pool(&self.pool)?).await,
            DatabaseDriver::Mysql => get_all_mysql(mysql_pool(&self.pool)?).await,
        }
    }

    async fn update_row(&self, post: &Post) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(sqlite_pool(&self.pool)?, post).await,
            DatabaseDriver::Mysql => update_mysql(mysql_pool(&self.pool)?, post).await,
        }
    }

    async fn delete_row(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        self.create_row(post).await.inspect_err(|e| {
            tracing::error!(operation = "create", title = %post.title, "Error creating post: {:#}", e)
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let result = self.fetch_one(id).await;
        match &result {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!(post_id = id, "No post found"),
            Err(e) => tracing::error!(
                operation = "get_by_id",
                post_id = id,
                "Error retrieving post: {:#}",
                e
            ),
        }
        result
    }

    async fn get_all(&self) -> Result<Vec<Post>> {
        self.fetch_all().await.inspect_err(|e| {
            tracing::error!(operation = "get_all", "Error retrieving posts: {:#}", e)
        })
    }

    async fn update(&self, post: &Post) -> Result<()> {
        match self.update_row(post).await {
            Ok(0) => {
                tracing::warn!(post_id = post.id, "Update matched no rows");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!(
                    operation = "update",
                    post_id = post.id,
                    "Error updating post: {:#}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.delete_row(id).await.inspect_err(|e| {
            tracing::error!(operation = "delete", post_id = id, "Error deleting post: {:#}", e)
        })
    }
}

// ============================================================================
// Row mapping
// ============================================================================

/// Encode a tag list for the `tags` column.
pub fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).context("Failed to encode tags")
}

/// Decode the `tags` column.
///
/// `NULL` and the empty string mean no tags. Values that do not parse as a
/// JSON string array are rows written in the older comma-joined form and
/// are split on `,` instead, so decoding never fails.
pub fn decode_tags(raw: Option<&str>) -> Vec<String> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Vec::new(),
        Some(raw) => raw,
    };

    if raw.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
            return tags;
        }
        tracing::debug!(tags = raw, "Tags value is not a JSON array, reading as comma-joined");
    }
    raw.split(',').map(str::to_string).collect()
}

/// Render a timestamp in the storage format.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp, interpreting it as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Malformed timestamp: {}", raw))
}

/// Current time truncated to the precision the table keeps
fn storage_now() -> String {
    format_timestamp(Utc::now())
}

/// Column values of one `posts` row, before decoding.
struct PostRow {
    id: i64,
    title: String,
    content: String,
    category: String,
    tags: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            tags: decode_tags(row.tags.as_deref()),
            created_at: parse_timestamp(&row.created_at).context("Error parsing created_at")?,
            updated_at: parse_timestamp(&row.updated_at).context("Error parsing updated_at")?,
        })
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = storage_now();
    let result = sqlx::query(
        "INSERT INTO posts (title, content, category, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_rowid();
    get_by_id_sqlite(pool, id)
        .await?
        .with_context(|| format!("Post {} not found after insert", id))
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post")?;
    row.map(|r| row_to_post_sqlite(&r)).transpose()
}

async fn get_all_sqlite(pool: &SqlitePool) -> Result<Vec<Post>> {
    let rows = sqlx::query(SELECT_ALL)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;
    rows.iter().map(row_to_post_sqlite).collect()
}

async fn update_sqlite(pool: &SqlitePool, post: &Post) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE posts SET title = ?, content = ?, category = ?, tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(storage_now())
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(result.rows_affected())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    PostRow {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }
    .try_into()
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = storage_now();
    let result = sqlx::query(
        "INSERT INTO posts (title, content, category, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = i64::try_from(result.last_insert_id()).context("Post id out of range")?;
    get_by_id_mysql(pool, id)
        .await?
        .with_context(|| format!("Post {} not found after insert", id))
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post")?;
    row.map(|r| row_to_post_mysql(&r)).transpose()
}

async fn get_all_mysql(pool: &MySqlPool) -> Result<Vec<Post>> {
    let rows = sqlx::query(SELECT_ALL)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;
    rows.iter().map(row_to_post_mysql).collect()
}

async fn update_mysql(pool: &MySqlPool, post: &Post) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE posts SET title = ?, content = ?, category = ?, tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.category)
    .bind(encode_tags(&post.tags)?)
    .bind(storage_now())
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;
    Ok(result.rows_affected())
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    PostRow {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }
    .try_into()
}
