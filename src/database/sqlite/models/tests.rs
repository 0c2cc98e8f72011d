use super::*;

#[test]
fn conversation_deserializes_camel_case_sidebar_title() {
    let json = r#"{
        "title": "Long autogenerated title",
        "url": "https://chat.example/c/1",
        "messages": [{"role": "user", "content": "hi"}],
        "sidebarTitle": "Short title"
    }"#;

    let conversation: Conversation =
        serde_json::from_str(json).expect("conversation should deserialize");

    assert_eq!(conversation.sidebar_title.as_deref(), Some("Short title"));
    assert_eq!(conversation.collection, DEFAULT_COLLECTION);
    assert_eq!(conversation.display_title(), "Short title");
}

#[test]
fn display_title_falls_back_to_title() {
    let mut conversation = Conversation {
        title: "Fallback".to_string(),
        url: "https://chat.example/c/2".to_string(),
        messages: vec![],
        sidebar_title: None,
        collection: DEFAULT_COLLECTION.to_string(),
    };
    assert_eq!(conversation.display_title(), "Fallback");

    conversation.sidebar_title = Some("   ".to_string());
    assert_eq!(conversation.display_title(), "Fallback");
}

#[test]
fn new_chat_encodes_transcript_as_json() {
    let conversation = Conversation {
        title: "t".to_string(),
        url: "https://chat.example/c/3".to_string(),
        messages: vec![Message {
            role: "user".to_string(),
            content: "what is borrowck?".to_string(),
        }],
        sidebar_title: None,
        collection: "Rust".to_string(),
    };

    let new_chat = NewChat::from_conversation(&conversation).expect("should encode");
    let decoded: Vec<Message> =
        serde_json::from_str(&new_chat.messages).expect("stored transcript should round-trip");

    assert_eq!(decoded, conversation.messages);
    assert_eq!(new_chat.collection, "Rust");
}
