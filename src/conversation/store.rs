//! Append-only transcript storage

use super::Message;

/// Ordered transcript of one session
///
/// There is no way to remove or edit a message once appended.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Everything except the newest message.
    ///
    /// The newest message is the user turn in flight; it goes out as the
    /// request input, not as history.
    pub fn history_before_last(&self) -> &[Message] {
        match self.messages.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn test_starts_empty() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        assert!(store.all().last().is_none());
        assert!(store.history_before_last().is_empty());
    }

    #[test]
    fn test_append_keeps_order() {
        let mut store = ConversationStore::new();
        store.append(Message::user("uno"));
        store.append(Message::assistant("dos"));
        store.append(Message::user("tres"));

        let contents: Vec<_> = store.all().iter().map(Message::content).collect();
        assert_eq!(contents, vec!["uno", "dos", "tres"]);
        assert_eq!(store.all().last().map(Message::role), Some(Role::User));
    }

    #[test]
    fn test_history_before_last_drops_only_newest() {
        let mut store = ConversationStore::new();
        store.append(Message::user("uno"));
        assert!(store.history_before_last().is_empty());

        store.append(Message::assistant("dos"));
        store.append(Message::user("tres"));
        let history = store.history_before_last();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content(), "dos");
    }
}
