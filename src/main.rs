use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chat_recall::Result;
use chat_recall::commands::{
    check_url, find_chats, list_chats, list_collections, save_chat, search, show_config,
    show_status,
};

#[derive(Parser)]
#[command(name = "chat-recall")]
#[command(about = "Save chat conversations and answer questions over them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a captured conversation from a JSON file
    Save {
        /// Path to the conversation JSON file
        file: PathBuf,
    },
    /// Ask a question over the saved chat archive
    Search {
        /// The question to answer
        query: String,
        /// Restrict retrieval to one collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// List all collections with saved chats
    Collections,
    /// List saved chats in one collection
    List {
        /// Collection name
        collection: String,
    },
    /// Search saved chat titles by substring
    Find {
        /// Title substring to look for
        term: String,
        /// Maximum number of chats to show
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Check whether a conversation url has already been saved
    Check {
        /// Conversation url
        url: String,
    },
    /// Show status of the archive and its backends
    Status,
    /// Show the active configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Save { file } => {
            save_chat(&file).await?;
        }
        Commands::Search { query, collection } => {
            search(query, collection).await?;
        }
        Commands::Collections => {
            list_collections().await?;
        }
        Commands::List { collection } => {
            list_chats(collection).await?;
        }
        Commands::Find { term, limit } => {
            find_chats(term, limit).await?;
        }
        Commands::Check { url } => {
            check_url(url).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Config { .. } => {
            show_config()?;
        }
    }

    Ok(())
}
