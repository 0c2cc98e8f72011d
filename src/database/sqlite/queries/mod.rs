
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{Chat, InsertOutcome, NewChat};

const CHAT_COLUMNS: &str = "id, title, url, messages, collection, created_at";

pub struct ChatQueries;

impl ChatQueries {
    /// Insert a chat unless its url already exists. Relies on the UNIQUE
    /// constraint with `ON CONFLICT DO NOTHING` so concurrent saves of the
    /// same url cannot both win.
    #[inline]
    pub async fn insert_if_absent(pool: &SqlitePool, new_chat: &NewChat) -> Result<InsertOutcome> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO chats (title, url, messages, collection, created_at) \
             VALUES (?, ?, ?, ?, ?) ON CONFLICT(url) DO NOTHING",
        )
        .bind(&new_chat.title)
        .bind(&new_chat.url)
        .bind(&new_chat.messages)
        .bind(&new_chat.collection)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to insert chat")?;

        if result.rows_affected() == 0 {
            debug!("Chat with url {} already exists", new_chat.url);
            let existing = Self::get_by_url(pool, &new_chat.url)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Chat disappeared after url conflict"))?;
            return Ok(InsertOutcome::Conflict(existing));
        }

        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }

    #[inline]
    pub async fn exists_by_url(pool: &SqlitePool, url: &str) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chats WHERE url = ?)")
            .bind(url)
            .fetch_one(pool)
            .await
            .context("Failed to check chat existence")?;

        Ok(exists != 0)
    }

    #[inline]
    pub async fn get_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(pool)
        .await
        .context("Failed to get chat by url")?;

        Ok(chat)
    }

    /// All distinct, non-empty collection names.
    #[inline]
    pub async fn list_collections(pool: &SqlitePool) -> Result<Vec<String>> {
        let collections: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT collection FROM chats \
             WHERE collection IS NOT NULL AND collection != '' \
             ORDER BY collection",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list collections")?;

        Ok(collections)
    }

    /// Chats in one collection, newest first.
    #[inline]
    pub async fn list_by_collection(pool: &SqlitePool, collection: &str) -> Result<Vec<Chat>> {
        let chats = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE collection = ? ORDER BY id DESC"
        ))
        .bind(collection)
        .fetch_all(pool)
        .await
        .context("Failed to list chats by collection")?;

        Ok(chats)
    }

    /// Case-insensitive substring match on stored titles.
    #[inline]
    pub async fn search_titles(pool: &SqlitePool, term: &str, limit: i64) -> Result<Vec<Chat>> {
        let pattern = format!("%{term}%");
        let chats = sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE title LIKE ? ORDER BY id DESC LIMIT ?"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to search chat titles")?;

        Ok(chats)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(pool)
            .await
            .context("Failed to count chats")?;

        Ok(count)
    }
}
