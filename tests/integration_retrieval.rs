//! End-to-end retrieval tests over the public API, using a deterministic
//! embedder so no external services are required.

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use chat_recall::RecallError;
use chat_recall::database::lancedb::LanceVectorIndex;
use chat_recall::database::sqlite::Database;
use chat_recall::database::sqlite::models::{Conversation, Message};
use chat_recall::embeddings::Embedder;
use chat_recall::retrieval::{
    IndexingOutcome, NO_RESULTS_ANSWER, RetrievalService, SaveOutcome,
};
use chat_recall::synthesis::AnswerSynthesizer;

const DIM: usize = 64;

/// Hashes words into a fixed-dimension bag-of-words vector. Texts sharing
/// vocabulary land near each other under cosine distance.
struct BagOfWordsEmbedder;

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for word in text.to_lowercase().split_whitespace() {
        let mut hash: u64 = 1469598103934665603;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(1099511628211);
        }
        vector[(hash % DIM as u64) as usize] += 1.0;
    }
    // Keep vectors non-zero even for empty text
    vector[0] += 0.01;
    vector
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RecallError> {
        Ok(texts.iter().map(|text| embed_text(text)).collect())
    }
}

struct CannedSynthesizer;

#[async_trait]
impl AnswerSynthesizer for CannedSynthesizer {
    async fn synthesize(&self, context: &str, question: &str) -> Result<String, RecallError> {
        assert!(!context.is_empty());
        Ok(format!("answer to: {question}"))
    }
}

async fn build_service(
    temp_dir: &TempDir,
    synthesizer: Option<Arc<dyn AnswerSynthesizer>>,
) -> RetrievalService {
    let database = Database::new(temp_dir.path().join("chats.db"))
        .await
        .expect("should create database");
    let index = LanceVectorIndex::new(&temp_dir.path().join("vectors"), DIM)
        .await
        .expect("should create vector store");

    RetrievalService::new(
        database,
        Arc::new(index),
        Arc::new(BagOfWordsEmbedder),
        synthesizer,
    )
}

fn conversation(url: &str, title: &str, collection: &str, lines: &[&str]) -> Conversation {
    Conversation {
        title: title.to_string(),
        url: url.to_string(),
        messages: lines
            .iter()
            .enumerate()
            .map(|(i, line)| Message {
                role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                content: (*line).to_string(),
            })
            .collect(),
        sidebar_title: None,
        collection: collection.to_string(),
    }
}

#[tokio::test]
async fn save_and_answer_question() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let service = build_service(&temp_dir, Some(Arc::new(CannedSynthesizer))).await;

    let outcome = service
        .save_conversation(&conversation(
            "https://chat.example/c/borrowing",
            "Borrow checker",
            "Rust",
            &[
                "explain the borrow checker to me",
                "the borrow checker enforces aliasing rules at compile time",
            ],
        ))
        .await
        .expect("save should succeed");
    assert!(matches!(
        outcome,
        SaveOutcome::Saved {
            indexing: IndexingOutcome::Indexed { .. },
            ..
        }
    ));

    let response = service
        .search("what does the borrow checker enforce", None)
        .await
        .expect("search should succeed");

    assert_eq!(response.answer, "answer to: what does the borrow checker enforce");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].url, "https://chat.example/c/borrowing");
}

#[tokio::test]
async fn retrieval_prefers_the_relevant_conversation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let service = build_service(&temp_dir, None).await;

    service
        .save_conversation(&conversation(
            "https://chat.example/c/sourdough",
            "Sourdough starter",
            "Cooking",
            &[
                "how do I keep a sourdough starter alive",
                "feed the sourdough starter flour and water daily",
            ],
        ))
        .await
        .expect("save should succeed");
    service
        .save_conversation(&conversation(
            "https://chat.example/c/lifetimes",
            "Lifetimes",
            "Rust",
            &[
                "what are lifetimes in rust",
                "lifetimes describe how long references remain valid",
            ],
        ))
        .await
        .expect("save should succeed");

    let response = service
        .search("how long do references remain valid", None)
        .await
        .expect("search should succeed");

    assert_eq!(
        response.sources[0].url,
        "https://chat.example/c/lifetimes"
    );
    assert!(response.answer.contains("references remain valid"));
}

#[tokio::test]
async fn collection_filter_scopes_retrieval() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let service = build_service(&temp_dir, None).await;

    service
        .save_conversation(&conversation(
            "https://chat.example/c/lifetimes",
            "Lifetimes",
            "Rust",
            &["rust lifetimes question", "rust lifetimes answer"],
        ))
        .await
        .expect("save should succeed");

    let scoped = service
        .search("rust lifetimes", Some("Cooking"))
        .await
        .expect("search should succeed");
    assert_eq!(scoped.answer, NO_RESULTS_ANSWER);
    assert!(scoped.sources.is_empty());

    let unscoped = service
        .search("rust lifetimes", Some("Rust"))
        .await
        .expect("search should succeed");
    assert_eq!(unscoped.sources.len(), 1);
}

#[tokio::test]
async fn duplicate_save_reports_already_saved() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let service = build_service(&temp_dir, None).await;

    let chat = conversation(
        "https://chat.example/c/once",
        "Only once",
        "Uncategorized",
        &["question", "answer"],
    );

    service
        .save_conversation(&chat)
        .await
        .expect("first save should succeed");
    let outcome = service
        .save_conversation(&chat)
        .await
        .expect("second save should succeed");

    match outcome {
        SaveOutcome::AlreadySaved { title, .. } => assert_eq!(title, "Only once"),
        SaveOutcome::Saved { .. } => panic!("second save must not insert"),
    }
    assert_eq!(
        service
            .database()
            .count_chats()
            .await
            .expect("count should succeed"),
        1
    );
}

#[tokio::test]
async fn long_transcripts_are_chunked_and_retrievable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let service = build_service(&temp_dir, None).await;

    let long_line = "the observer pattern decouples publishers from subscribers ".repeat(12);
    let lines: Vec<&str> = vec![
        &long_line,
        "tell me more about event listeners",
        &long_line,
        "what about weak references to observers",
    ];

    let outcome = service
        .save_conversation(&conversation(
            "https://chat.example/c/observers",
            "Observer pattern",
            "Design",
            &lines,
        ))
        .await
        .expect("save should succeed");

    let chunks = match outcome {
        SaveOutcome::Saved {
            indexing: IndexingOutcome::Indexed { chunks },
            ..
        } => chunks,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert!(chunks > 1);

    let response = service
        .search("observer pattern publishers subscribers", None)
        .await
        .expect("search should succeed");

    // Several chunks of the same chat match; sources still list it once
    assert_eq!(response.sources.len(), 1);
    assert_eq!(
        response.sources[0].url,
        "https://chat.example/c/observers"
    );
}
