use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::debug;

use crate::database::sqlite::models::{Chat, InsertOutcome, NewChat};
use crate::database::sqlite::queries::ChatQueries;

#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Canonical chat archive. The relational record is the record of truth;
/// vector coverage derived from it is best-effort.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.init_schema().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                messages TEXT NOT NULL,
                collection TEXT NOT NULL DEFAULT 'Uncategorized',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create chats table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_collection ON chats (collection)")
            .execute(&self.pool)
            .await
            .context("Failed to create collection index")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_title ON chats (title)")
            .execute(&self.pool)
            .await
            .context("Failed to create title index")?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Atomic insert-if-absent on the url unique key. The unique constraint,
    /// not a prior existence check, decides the winner under concurrent saves.
    pub async fn insert_if_absent(&self, new_chat: &NewChat) -> Result<InsertOutcome> {
        ChatQueries::insert_if_absent(&self.pool, new_chat).await
    }

    pub async fn exists_by_url(&self, url: &str) -> Result<bool> {
        ChatQueries::exists_by_url(&self.pool, url).await
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Chat>> {
        ChatQueries::get_by_url(&self.pool, url).await
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        ChatQueries::list_collections(&self.pool).await
    }

    pub async fn list_by_collection(&self, collection: &str) -> Result<Vec<Chat>> {
        ChatQueries::list_by_collection(&self.pool, collection).await
    }

    pub async fn search_titles(&self, term: &str, limit: i64) -> Result<Vec<Chat>> {
        ChatQueries::search_titles(&self.pool, term, limit).await
    }

    pub async fn count_chats(&self) -> Result<i64> {
        ChatQueries::count(&self.pool).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    pub async fn optimize(&self) -> Result<()> {
        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
