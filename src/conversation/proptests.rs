//! Property-based tests for the transcript protocol
//!
//! - Mapping covers exactly the turns before the newest one
//! - Only the two external roles ever appear
//! - Assembled text is the in-order concatenation of non-empty chunks
//! - A failure always finalizes with the fallback text

use super::{
    map_history, AssemblerState, ConversationStore, ExternalRole, Finalized, Message,
    ResponseAssembler, Role, FALLBACK_TEXT, TYPING_INDICATOR,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (arb_role(), "[a-zA-Z0-9áéíóúñ¿? .,]{1,60}")
        .prop_map(|(role, content)| Message::new(role, content))
}

fn arb_transcript() -> impl Strategy<Value = Vec<Message>> {
    proptest::collection::vec(arb_message(), 1..20)
}

/// Chunks as a remote stream might emit them, empty ones included
fn arb_chunks() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            1 => Just(String::new()),
            4 => "[a-zA-Z0-9áéíóú .,\n]{1,20}",
        ],
        0..30,
    )
}

fn store_from(messages: &[Message]) -> ConversationStore {
    let mut store = ConversationStore::new();
    for message in messages {
        store.append(message.clone());
    }
    store
}

// ============================================================================
// Mapping
// ============================================================================

proptest! {
    /// map(T[:-1]) has len(T)-1 entries and matches T minus its last element
    #[test]
    fn prop_mapping_excludes_newest(transcript in arb_transcript()) {
        let store = store_from(&transcript);
        let mapped = map_history(store.history_before_last());

        prop_assert_eq!(mapped.len(), transcript.len() - 1);
        for (turn, message) in mapped.iter().zip(&transcript) {
            prop_assert_eq!(turn.parts.as_str(), message.content());
        }
    }

    /// user -> user, assistant -> model, nothing else
    #[test]
    fn prop_role_table_is_exhaustive(transcript in arb_transcript()) {
        let mapped = map_history(&transcript);
        for (turn, message) in mapped.iter().zip(&transcript) {
            let expected = match message.role() {
                Role::User => ExternalRole::User,
                Role::Assistant => ExternalRole::Model,
            };
            prop_assert_eq!(turn.role, expected);
            prop_assert!(matches!(turn.role.as_str(), "user" | "model"));
        }
    }

    /// Appending N user/assistant pairs yields 2N alternating turns
    #[test]
    fn prop_pairs_alternate(pairs in proptest::collection::vec(
        ("[a-z ]{1,20}", "[a-z ]{1,20}"), 0..15,
    )) {
        let mut store = ConversationStore::new();
        for (question, answer) in &pairs {
            store.append(Message::user(question.as_str()));
            store.append(Message::assistant(answer.as_str()));
        }

        prop_assert_eq!(store.len(), pairs.len() * 2);
        for (i, message) in store.all().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            prop_assert_eq!(message.role(), expected);
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

proptest! {
    /// Final text equals the concatenation of non-empty chunks in order
    #[test]
    fn prop_assembly_concatenates(chunks in arb_chunks()) {
        let mut assembler = ResponseAssembler::new();
        let mut last_view = None;
        for chunk in &chunks {
            if let Some(view) = assembler.push_chunk(chunk) {
                prop_assert!(view.ends_with(TYPING_INDICATOR));
                last_view = Some(view);
            }
        }

        let expected: String = chunks.concat();
        let result = assembler.finish();
        if expected.is_empty() {
            prop_assert_eq!(result, Finalized::Fallback);
        } else {
            prop_assert_eq!(result.text(), expected.as_str());
            let view = last_view.unwrap_or_default();
            prop_assert_eq!(view.strip_suffix(TYPING_INDICATOR), Some(expected.as_str()));
        }
        prop_assert_eq!(
            assembler.chunk_count(),
            chunks.iter().filter(|c| !c.is_empty()).count()
        );
    }

    /// Failing after any prefix of the stream yields the fallback, never the prefix
    #[test]
    fn prop_failure_yields_fallback(chunks in arb_chunks(), cut in 0usize..30) {
        let mut assembler = ResponseAssembler::new();
        for chunk in chunks.iter().take(cut) {
            assembler.push_chunk(chunk);
        }

        let result = assembler.fail();
        prop_assert_eq!(assembler.state(), AssemblerState::Finalized);
        prop_assert_eq!(result.text(), FALLBACK_TEXT);
    }
}
