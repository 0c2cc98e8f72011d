// Retrieval module
// Orchestrates ingestion and question answering over the saved chat archive


pub mod sources;

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::RecallError;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{Conversation, InsertOutcome, NewChat};
use crate::database::{ChunkMetadata, MetadataFilter, VectorIndex, VectorRecord};
use crate::embeddings::Embedder;
use crate::embeddings::chunking::chunk_messages;
use crate::synthesis::AnswerSynthesizer;

pub use sources::{SourceRef, dedupe_sources};

/// How many nearest chunks to retrieve per question.
pub const TOP_K: usize = 20;

/// Separator between chunk documents in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Canned answer when no chunk matches the question at all.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant information in your saved chats to answer that.";

/// Result of saving one conversation.
#[derive(Debug)]
pub enum SaveOutcome {
    /// A chat with the same url was already archived; nothing was written.
    AlreadySaved { chat_id: i64, title: String },
    /// The chat was archived. Indexing is reported separately because a
    /// failed embedding pass must not lose the archived transcript.
    Saved {
        chat_id: i64,
        indexing: IndexingOutcome,
    },
}

/// What happened to vector coverage for a newly archived chat.
#[derive(Debug)]
pub enum IndexingOutcome {
    Indexed { chunks: usize },
    /// The transcript produced no chunks, so there was nothing to index.
    Skipped,
    /// Embedding or the index write failed. The chat row is still archived
    /// and a later re-index can restore coverage.
    Failed(RecallError),
}

/// Answer plus deduplicated citations for one question.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Ties the archive, the vector index, the embedder, and the optional answer
/// generator together. Backends are trait objects so callers choose the
/// wiring.
pub struct RetrievalService {
    database: Database,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    synthesizer: Option<Arc<dyn AnswerSynthesizer>>,
}

impl RetrievalService {
    #[inline]
    pub fn new(
        database: Database,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        synthesizer: Option<Arc<dyn AnswerSynthesizer>>,
    ) -> Self {
        Self {
            database,
            index,
            embedder,
            synthesizer,
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Archive a conversation and index it for retrieval.
    ///
    /// The relational insert decides idempotency: a url that already exists
    /// returns [`SaveOutcome::AlreadySaved`] without touching the vector
    /// index. Indexing failures are reported in the outcome, not as errors,
    /// so the archived transcript survives an unreachable embedding backend.
    pub async fn save_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<SaveOutcome, RecallError> {
        let new_chat = NewChat::from_conversation(conversation)?;

        let inserted = self
            .database
            .insert_if_absent(&new_chat)
            .await
            .map_err(|e| RecallError::Database(format!("{e:#}")))?;

        match inserted {
            InsertOutcome::Conflict(existing) => {
                info!("Chat already saved: {}", existing.url);
                Ok(SaveOutcome::AlreadySaved {
                    chat_id: existing.id,
                    title: existing.title,
                })
            }
            InsertOutcome::Inserted(chat_id) => {
                let indexing = match self.index_conversation(chat_id, conversation).await {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        warn!(
                            "Indexing failed for chat {} ({}): {}",
                            chat_id, conversation.url, error
                        );
                        IndexingOutcome::Failed(error)
                    }
                };

                Ok(SaveOutcome::Saved { chat_id, indexing })
            }
        }
    }

    async fn index_conversation(
        &self,
        chat_id: i64,
        conversation: &Conversation,
    ) -> Result<IndexingOutcome, RecallError> {
        let chunks = chunk_messages(chat_id, &conversation.messages);
        if chunks.is_empty() {
            debug!("Chat {} has no messages to index", chat_id);
            return Ok(IndexingOutcome::Skipped);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RecallError::Embedding(format!(
                "Expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let title = conversation.display_title();
        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.vector_id(),
                vector,
                document: chunk.text.clone(),
                metadata: ChunkMetadata {
                    parent_id: chunk.parent_id,
                    title: title.to_string(),
                    url: conversation.url.clone(),
                    chunk_index: chunk.index,
                    collection: conversation.collection.clone(),
                },
            })
            .collect();

        self.index.upsert(&records).await?;
        info!("Indexed chat {} as {} chunks", chat_id, records.len());

        Ok(IndexingOutcome::Indexed {
            chunks: records.len(),
        })
    }

    /// Answer a question from the archive.
    ///
    /// Retrieval failures (embedding the question, querying the index) are
    /// hard errors. Synthesis failures are not: the retrieved context is the
    /// valuable part, so the response degrades to raw context with a note.
    pub async fn search(
        &self,
        query: &str,
        collection: Option<&str>,
    ) -> Result<SearchResponse, RecallError> {
        if query.trim().is_empty() {
            return Err(RecallError::Validation(
                "Search query must not be empty".to_string(),
            ));
        }

        let mut query_vectors = self.embedder.embed(vec![query.to_string()]).await?;
        let query_vector = if query_vectors.is_empty() {
            return Err(RecallError::Embedding(
                "Embedder returned no vector for the query".to_string(),
            ));
        } else {
            query_vectors.swap_remove(0)
        };

        let filter = collection
            .filter(|name| !name.is_empty())
            .map(|name| MetadataFilter::new().equals("collection", name));

        let hits = self
            .index
            .query(&query_vector, TOP_K, filter.as_ref())
            .await?;
        debug!("Retrieved {} chunks for query", hits.len());

        if hits.is_empty() {
            return Ok(SearchResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = hits
            .iter()
            .map(|hit| hit.document.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let sources = dedupe_sources(&hits);

        let answer = match &self.synthesizer {
            None => format!(
                "Answer generation is not configured. Raw context from your saved chats:\n\n{context}"
            ),
            Some(synthesizer) => match synthesizer.synthesize(&context, query).await {
                Ok(answer) => answer,
                Err(error) => {
                    warn!("Answer synthesis failed: {}", error);
                    format!(
                        "Error generating an answer: {error}. Raw context from your saved chats:\n\n{context}"
                    )
                }
            },
        };

        Ok(SearchResponse { answer, sources })
    }
}
