#[cfg(test)]
mod tests;

use tracing::debug;

use crate::database::sqlite::models::Message;

/// A chunk is closed once its accumulated text exceeds this many characters.
/// The final chunk of a conversation is always flushed regardless of length.
pub const CHUNK_CHAR_THRESHOLD: usize = 500;

/// A bounded span of transcript lines, the unit of embedding and retrieval.
///
/// Identity is `(parent_id, index)`; indices are contiguous and zero-based
/// within the parent conversation, so re-chunking the same transcript yields
/// the same vector ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub parent_id: i64,
    pub index: u32,
    pub text: String,
}

impl Chunk {
    /// Globally unique id for the vector index.
    pub fn vector_id(&self) -> String {
        format!("{}_{}", self.parent_id, self.index)
    }
}

/// Split an ordered transcript into bounded chunks.
///
/// Greedy single pass: each message is appended to the current buffer as a
/// `"role: content\n"` line, and the buffer is flushed once it exceeds
/// [`CHUNK_CHAR_THRESHOLD`] characters or the last message was appended.
/// Messages are never split mid-content, so a single oversized message
/// produces one oversized chunk. Concatenating the emitted chunk texts in
/// order reconstructs the transcript exactly.
pub fn chunk_messages(parent_id: i64, messages: &[Message]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut index: u32 = 0;

    let last = messages.len().saturating_sub(1);
    for (i, message) in messages.iter().enumerate() {
        buffer.push_str(&message.role);
        buffer.push_str(": ");
        buffer.push_str(&message.content);
        buffer.push('\n');

        if buffer.chars().count() > CHUNK_CHAR_THRESHOLD || i == last {
            chunks.push(Chunk {
                parent_id,
                index,
                text: std::mem::take(&mut buffer),
            });
            index += 1;
        }
    }

    debug!(
        "Chunked conversation {} into {} chunks from {} messages",
        parent_id,
        chunks.len(),
        messages.len()
    );

    chunks
}
