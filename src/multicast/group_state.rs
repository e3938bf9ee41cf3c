mod duplicate_filter;
mod lamport_clock;
mod pending_acks;

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use crate::multicast::group_state::duplicate_filter::DuplicateFilter;
use crate::multicast::group_state::lamport_clock::LamportClock;
use crate::multicast::group_state::pending_acks::PendingAckTable;
use crate::packet::{DataMessage, MessageId};
use crate::ProcessId;

pub use pending_acks::AckOutcome;

/// What duplicate detection decided for a received message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// First receipt: deliver it, the local clock is now `local_clock`
    Deliver { local_clock: u64 },
    Duplicate,
    /// Merging the carried clock would overflow; the message is not marked as delivered
    ClockExhausted,
}

/// The mutable state shared by the receiver, the retransmitter and the caller of `multicast`.
///
/// Every method takes the single lock once and never performs I/O while holding it.
#[derive(Debug)]
pub struct GroupState {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    clock: LamportClock,
    history: DuplicateFilter,
    pending: PendingAckTable,
}

impl GroupState {
    pub fn new(retransmission_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                clock: LamportClock::new(),
                history: DuplicateFilter::new(),
                pending: PendingAckTable::new(retransmission_timeout),
            }),
        }
    }

    // No method can leave `Inner` half-updated, so a poisoned lock is still consistent
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamps a new message and registers it as pending, as one atomic step.
    /// Returns `None`, registering nothing, once the clock has reached `u64::MAX`.
    pub fn originate(&self, sender_id: ProcessId, payload: &str, destinations: BTreeSet<ProcessId>, now: Instant) -> Option<DataMessage> {
        let mut inner = self.lock();

        let lamport_clock = inner.clock.tick_on_send()?;
        let message = DataMessage {
            sender_id,
            payload: payload.to_string(),
            message_id: MessageId::generate(),
            lamport_clock,
            wall_clock: chrono::Local::now().to_rfc3339(),
        };
        inner.pending.register(message.clone(), destinations, now);

        Some(message)
    }

    /// Runs duplicate detection for a received message and, the first time only,
    /// merges its clock. The message is marked as delivered only if the merge succeeds.
    pub fn accept(&self, message: &DataMessage) -> Acceptance {
        let mut inner = self.lock();

        if inner.history.contains(&message.message_id) {
            return Acceptance::Duplicate;
        }
        let Some(local_clock) = inner.clock.observe(message.lamport_clock) else {
            return Acceptance::ClockExhausted;
        };
        inner.history.check_and_mark(&message.message_id);
        Acceptance::Deliver { local_clock }
    }

    pub fn on_ack(&self, message_id: &MessageId, from: ProcessId) -> AckOutcome {
        self.lock().pending.on_ack(message_id, from)
    }

    pub fn sweep(&self, now: Instant) -> Vec<(DataMessage, BTreeSet<ProcessId>)> {
        self.lock().pending.sweep(now)
    }

    pub fn touch(&self, message_id: &MessageId, at: Instant) -> bool {
        self.lock().pending.touch(message_id, at)
    }

    pub fn clock(&self) -> u64 {
        self.lock().clock.value()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_pending(&self, message_id: &MessageId) -> bool {
        self.lock().pending.contains(message_id)
    }

    /// Destinations that still owe an ACK for `message_id`
    pub fn acks_needed(&self, message_id: &MessageId) -> Option<BTreeSet<ProcessId>> {
        self.lock()
            .pending
            .get(message_id)
            .map(|entry| entry.acks_needed.clone())
    }

    pub fn delivered_count(&self) -> usize {
        self.lock().history.len()
    }

    pub fn has_delivered(&self, message_id: &MessageId) -> bool {
        self.lock().history.contains(message_id)
    }
}
