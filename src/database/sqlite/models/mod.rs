#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_COLLECTION: &str = "Uncategorized";

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

/// A single transcript message. Immutable once part of a saved conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Ingestion payload for one captured conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub title: String,
    /// Unique natural key for the conversation.
    pub url: String,
    pub messages: Vec<Message>,
    #[serde(
        rename = "sidebarTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sidebar_title: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Conversation {
    /// The sidebar title is usually the more descriptive one when present.
    pub fn display_title(&self) -> &str {
        self.sidebar_title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(&self.title)
    }
}

/// Canonical chat row as stored in SQLite.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub url: String,
    /// JSON-encoded transcript, see [`Chat::message_list`].
    pub messages: String,
    pub collection: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn message_list(&self) -> Result<Vec<Message>> {
        serde_json::from_str(&self.messages).context("Failed to decode stored transcript")
    }
}

#[derive(Debug, Clone)]
pub struct NewChat {
    pub title: String,
    pub url: String,
    pub messages: String,
    pub collection: String,
}

impl NewChat {
    pub fn from_conversation(conversation: &Conversation) -> Result<Self> {
        Ok(Self {
            title: conversation.display_title().to_string(),
            url: conversation.url.clone(),
            messages: serde_json::to_string(&conversation.messages)
                .context("Failed to encode transcript")?,
            collection: conversation.collection.clone(),
        })
    }
}

/// Result of the atomic insert-if-absent on the url key.
#[derive(Debug)]
pub enum InsertOutcome {
    /// This caller won the insert and owns follow-up indexing.
    Inserted(i64),
    /// A chat with the same url already exists; no row was written.
    Conflict(Chat),
}
