use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use crate::packet::{DataMessage, MessageId};
use crate::ProcessId;

/// A locally originated message still waiting for acknowledgements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub message: DataMessage,
    pub acks_needed: BTreeSet<ProcessId>,
    pub last_sent: Instant,
}

/// What an incoming ACK did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Unknown `MessageId` or destination already removed: a late or duplicate ACK
    Ignored,
    Progress { remaining: usize },
    /// The last missing ACK arrived and the entry is gone
    Completed,
}

/// Outstanding multicasts, keyed by `MessageId`.
/// An entry exists exactly as long as at least one destination has not acknowledged it.
#[derive(Debug)]
pub struct PendingAckTable {
    entries: HashMap<MessageId, PendingEntry>,
    retransmission_timeout: Duration,
}

impl PendingAckTable {
    pub fn new(retransmission_timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retransmission_timeout,
        }
    }

    /// Starts tracking `message` until every id in `destinations` acknowledges it.
    /// # Return
    /// `false` if `destinations` is empty, in which case nothing is tracked
    pub fn register(&mut self, message: DataMessage, destinations: BTreeSet<ProcessId>, now: Instant) -> bool {
        if destinations.is_empty() {
            log::info!("Message {} has no destinations, not tracking acknowledgements", message.message_id.short());
            return false;
        }

        let message_id = message.message_id.clone();
        let entry = PendingEntry {
            message,
            acks_needed: destinations,
            last_sent: now,
        };
        if self.entries.insert(message_id.clone(), entry).is_some() {
            log::warn!("Message id {message_id} registered twice, previous entry replaced");
        }
        true
    }

    /// Records that `from` acknowledged `message_id`
    pub fn on_ack(&mut self, message_id: &MessageId, from: ProcessId) -> AckOutcome {
        let Some(entry) = self.entries.get_mut(message_id) else {
            return AckOutcome::Ignored;
        };

        if !entry.acks_needed.remove(&from) {
            return AckOutcome::Ignored;
        }

        if entry.acks_needed.is_empty() {
            self.entries.remove(message_id);
            AckOutcome::Completed
        } else {
            AckOutcome::Progress {
                remaining: entry.acks_needed.len(),
            }
        }
    }

    /// Returns a snapshot of every entry whose last send is strictly older than the timeout,
    /// together with the destinations that still owe an ACK
    pub fn sweep(&self, now: Instant) -> Vec<(DataMessage, BTreeSet<ProcessId>)> {
        self.entries
            .values()
            .filter(|entry| now.saturating_duration_since(entry.last_sent) > self.retransmission_timeout)
            .map(|entry| (entry.message.clone(), entry.acks_needed.clone()))
            .collect()
    }

    /// Sets `last_sent` after a resend. Has no effect if the entry was completed meanwhile.
    /// # Return
    /// whether the entry still existed
    pub fn touch(&mut self, message_id: &MessageId, at: Instant) -> bool {
        match self.entries.get_mut(message_id) {
            Some(entry) => {
                entry.last_sent = at;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, message_id: &MessageId) -> Option<&PendingEntry> {
        self.entries.get(message_id)
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.entries.contains_key(message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
