use std::collections::HashSet;
use crate::packet::MessageId;

/// History of the `MessageId`s already delivered to the application.
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    delivered: HashSet<MessageId>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `message_id` as delivered.
    /// # Return
    /// `true` the first time a given `message_id` is seen, `false` afterwards
    pub fn check_and_mark(&mut self, message_id: &MessageId) -> bool {
        if self.delivered.contains(message_id) {
            return false;
        }
        self.delivered.insert(message_id.clone())
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.delivered.contains(message_id)
    }

    pub fn len(&self) -> usize {
        self.delivered.len()
    }
}
