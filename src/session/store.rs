use thiserror::Error;

use crate::common::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("message index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },
}

/// Append-only transcript. Insertion order is display order.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the end and returns the new message's index.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn at(&self, index: usize) -> Result<&Message, StoreError> {
        self.messages.get(index).ok_or(StoreError::OutOfRange {
            index,
            count: self.messages.len(),
        })
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Owned copy handed to rendering surfaces.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Only used on session reset.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Sender;

    #[test]
    fn append_grows_by_one_and_keeps_prefix() {
        let mut store = MessageStore::new();
        let mut seen = Vec::new();

        for (i, text) in ["one", "two", "three", "four"].into_iter().enumerate() {
            let before = store.count();
            let message = Message::user(text);
            seen.push(message.id());

            let index = store.append(message);

            assert_eq!(index, i);
            assert_eq!(store.count(), before + 1);
            let ids: Vec<_> = store.iter().map(Message::id).collect();
            assert_eq!(ids, seen);
        }
    }

    #[test]
    fn at_reports_out_of_range() {
        let mut store = MessageStore::new();
        store.append(Message::opponent("greeting"));

        assert_eq!(store.at(0).map(Message::sender), Ok(Sender::Opponent));
        assert_eq!(
            store.at(1).unwrap_err(),
            StoreError::OutOfRange { index: 1, count: 1 }
        );
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut store = MessageStore::new();
        store.append(Message::opponent("greeting"));
        let snapshot = store.snapshot();

        store.append(Message::user("Jaipur"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.count(), 2);
        assert_eq!(store.last().map(Message::content), Some("Jaipur"));
    }
}
