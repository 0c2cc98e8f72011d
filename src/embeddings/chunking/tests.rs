use super::*;

fn message(role: &str, content: &str) -> Message {
    Message {
        role: role.to_string(),
        content: content.to_string(),
    }
}

fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}\n", m.role, m.content))
        .collect()
}

#[test]
fn empty_conversation_yields_no_chunks() {
    assert!(chunk_messages(1, &[]).is_empty());
}

#[test]
fn short_conversation_yields_single_chunk() {
    // 3 messages totaling well under the threshold
    let messages = vec![
        message("user", &"a".repeat(60)),
        message("model", &"b".repeat(70)),
        message("user", &"c".repeat(50)),
    ];

    let chunks = chunk_messages(7, &messages);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].vector_id(), "7_0");
    assert_eq!(chunks[0].text, transcript(&messages));
}

#[test]
fn long_conversation_splits_into_multiple_chunks() {
    // 5 messages around 240 chars each, each under the threshold on its own
    let messages: Vec<Message> = (0..5)
        .map(|i| message(if i % 2 == 0 { "user" } else { "model" }, &"x".repeat(240)))
        .collect();

    let chunks = chunk_messages(3, &messages);

    assert!(chunks.len() >= 2, "expected multiple chunks, got {}", chunks.len());
}

#[test]
fn concatenated_chunks_reproduce_transcript() {
    let messages: Vec<Message> = (0..9)
        .map(|i| message("user", &format!("message number {} {}", i, "y".repeat(i * 90))))
        .collect();

    let chunks = chunk_messages(11, &messages);
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();

    assert_eq!(rebuilt, transcript(&messages));
}

#[test]
fn only_final_chunk_may_close_under_threshold() {
    let messages: Vec<Message> = (0..6)
        .map(|_| message("user", &"z".repeat(200)))
        .collect();

    let chunks = chunk_messages(1, &messages);

    for chunk in &chunks[..chunks.len() - 1] {
        assert!(
            chunk.text.chars().count() > CHUNK_CHAR_THRESHOLD,
            "non-final chunk closed at {} chars",
            chunk.text.chars().count()
        );
    }
}

#[test]
fn oversized_single_message_is_not_split() {
    let messages = vec![message("model", &"w".repeat(2000))];

    let chunks = chunk_messages(5, &messages);

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].text.chars().count() > CHUNK_CHAR_THRESHOLD);
}

#[test]
fn indices_are_contiguous_and_zero_based() {
    let messages: Vec<Message> = (0..20)
        .map(|i| message("user", &format!("{} {}", i, "q".repeat(180))))
        .collect();

    let chunks = chunk_messages(9, &messages);

    for (expected, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index as usize, expected);
        assert_eq!(chunk.parent_id, 9);
    }
}

#[test]
fn rechunking_is_deterministic() {
    let messages: Vec<Message> = (0..8)
        .map(|i| message("model", &format!("answer {} {}", i, "r".repeat(170))))
        .collect();

    let first = chunk_messages(42, &messages);
    let second = chunk_messages(42, &messages);

    assert_eq!(first, second);
    let ids: Vec<String> = first.iter().map(Chunk::vector_id).collect();
    let second_ids: Vec<String> = second.iter().map(Chunk::vector_id).collect();
    assert_eq!(ids, second_ids);
}

#[test]
fn threshold_counts_characters_not_bytes() {
    // 200 snowmen are 600 bytes but only 200 characters, so the first
    // message must not close a chunk on its own
    let messages = vec![
        message("user", &"☃".repeat(200)),
        message("model", "done"),
    ];

    let chunks = chunk_messages(2, &messages);

    assert_eq!(chunks.len(), 1);
}
