use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, get_config_dir};
use crate::database::lancedb::LanceVectorIndex;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::Conversation;
use crate::embeddings::ollama::OllamaClient;
use crate::retrieval::{IndexingOutcome, RetrievalService, SaveOutcome};
use crate::synthesis::{AnswerSynthesizer, OllamaGenerator};

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

/// Wire the full retrieval stack from configuration.
async fn build_service(config: &Config) -> Result<RetrievalService> {
    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    let index = LanceVectorIndex::new(
        &config.vector_database_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await
    .context("Failed to initialize vector store")?;

    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;

    let synthesizer = OllamaGenerator::from_config(&config.ollama, &config.generation)?
        .map(|generator| Arc::new(generator) as Arc<dyn AnswerSynthesizer>);

    Ok(RetrievalService::new(
        database,
        Arc::new(index),
        Arc::new(embedder),
        synthesizer,
    ))
}

/// Save a captured conversation from a JSON file
#[inline]
pub async fn save_chat(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read conversation file: {}", path.display()))?;
    let conversation: Conversation =
        serde_json::from_str(&content).context("Failed to parse conversation JSON")?;

    info!("Saving conversation: {}", conversation.url);

    let config = load_config()?;
    let service = build_service(&config).await?;

    match service.save_conversation(&conversation).await? {
        SaveOutcome::AlreadySaved { title, .. } => {
            println!("Chat already saved: {}", title);
        }
        SaveOutcome::Saved { chat_id, indexing } => {
            println!(
                "✅ Saved chat: {} (ID: {})",
                conversation.display_title(),
                chat_id
            );
            match indexing {
                IndexingOutcome::Indexed { chunks } => {
                    println!("   Indexed {} chunks for search", chunks);
                }
                IndexingOutcome::Skipped => {
                    println!("   No messages to index");
                }
                IndexingOutcome::Failed(error) => {
                    warn!("Indexing failed for chat {}: {}", chat_id, error);
                    println!("   ⚠️  Chat saved but indexing failed: {}", error);
                    println!("   The chat will not appear in search results until re-indexed.");
                }
            }
        }
    }

    Ok(())
}

/// Ask a question over the saved chat archive
#[inline]
pub async fn search(query: String, collection: Option<String>) -> Result<()> {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let response = service.search(&query, collection.as_deref()).await?;

    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            println!("  • {} ({})", source.title, source.url);
        }
    }

    Ok(())
}

/// List all collections with saved chats
#[inline]
pub async fn list_collections() -> Result<()> {
    let config = load_config()?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    let collections = database.list_collections().await?;

    if collections.is_empty() {
        println!("No chats have been saved yet.");
        println!("Use 'chat-recall save <file>' to save a conversation.");
        return Ok(());
    }

    println!("Collections ({} total):", collections.len());
    for collection in &collections {
        let chats = database.list_by_collection(collection).await?;
        println!("  📁 {} ({} chats)", collection, chats.len());
    }

    Ok(())
}

/// List saved chats in one collection, newest first
#[inline]
pub async fn list_chats(collection: String) -> Result<()> {
    let config = load_config()?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    let chats = database.list_by_collection(&collection).await?;

    if chats.is_empty() {
        println!("No chats in collection '{}'.", collection);
        return Ok(());
    }

    println!("Chats in '{}' ({} total):", collection, chats.len());
    println!();
    for chat in &chats {
        println!("💬 {} (ID: {})", chat.title, chat.id);
        println!("   URL: {}", chat.url);
        println!(
            "   Saved: {}",
            chat.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Search saved chat titles by substring
#[inline]
pub async fn find_chats(term: String, limit: i64) -> Result<()> {
    let config = load_config()?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    let chats = database.search_titles(&term, limit).await?;

    if chats.is_empty() {
        println!("No chat titles match '{}'.", term);
        return Ok(());
    }

    println!("Chats matching '{}' ({} shown):", term, chats.len());
    println!();
    for chat in &chats {
        println!("💬 {} (ID: {})", chat.title, chat.id);
        println!("   URL: {}", chat.url);
        println!("   Collection: {}", chat.collection);
        println!();
    }

    Ok(())
}

/// Check whether a conversation url has already been saved
#[inline]
pub async fn check_url(url: String) -> Result<()> {
    let config = load_config()?;
    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    match database.get_by_url(&url).await? {
        Some(chat) => {
            println!("✅ Already saved: {} (ID: {})", chat.title, chat.id);
            println!("   Collection: {}", chat.collection);
            println!(
                "   Saved: {}",
                chat.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => {
            println!("Not saved: {}", url);
        }
    }

    Ok(())
}

/// Show status of the archive and its backends
#[inline]
pub async fn show_status() -> Result<()> {
    println!("📊 Chat-Recall Status Report");
    println!("{}", "=".repeat(50));
    println!();

    // A broken config must not silently fall back to defaults: the default
    // base_dir is empty and the checks below would probe (and create)
    // databases in the current directory.
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            println!("⚙️  Configuration:");
            println!("   ❌ Failed to load - {:#}", e);
            println!("   Fix the configuration file and run status again.");
            return Ok(());
        }
    };

    println!("🗄️  Database Status:");
    match Database::new(config.database_path()).await {
        Ok(database) => {
            println!("   ✅ SQLite: Connected");
            match database.count_chats().await {
                Ok(count) => println!("   💬 Saved Chats: {}", count),
                Err(e) => println!("   ⚠️  Failed to count chats: {}", e),
            }
            match database.list_collections().await {
                Ok(collections) => println!("   📁 Collections: {}", collections.len()),
                Err(e) => println!("   ⚠️  Failed to list collections: {}", e),
            }
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {}", e);
        }
    }

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }

    println!("🔍 Vector Database Status:");
    match LanceVectorIndex::new(
        &config.vector_database_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await
    {
        Ok(_index) => {
            println!("   ✅ LanceDB: Connected");
            println!(
                "   📐 Embedding Dimension: {}",
                config.ollama.embedding_dimension
            );
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
        }
    }

    println!("✨ Answer Generation:");
    match &config.generation.model {
        Some(model) => {
            println!("   ✅ Configured with model: {}", model);
        }
        None => {
            println!("   💤 Not configured; searches return raw context");
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'chat-recall save <file>' to save a captured conversation");
    println!("   • Use 'chat-recall search <question>' to ask about your saved chats");
    println!("   • Use 'chat-recall collections' to see your collections");

    Ok(())
}

/// Print the active configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration file: {}", config.config_file_path().display());
    println!();
    println!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );

    Ok(())
}
