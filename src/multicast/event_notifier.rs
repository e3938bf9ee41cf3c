use std::collections::BTreeSet;
use crossbeam_channel::{SendError, Sender};
use crate::packet::MessageId;
use crate::ProcessId;

/// A message handed to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sender_id: ProcessId,
    pub payload: String,
    pub message_id: MessageId,
    /// Clock value the sender stamped the message with
    pub sender_clock: u64,
    /// Local clock right after merging `sender_clock`
    pub local_clock: u64,
    pub wall_clock: String,
}

/// Notices emitted towards the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MulticastEvent {
    Sent {
        message_id: MessageId,
        lamport_clock: u64,
        payload: String,
        destinations: BTreeSet<ProcessId>,
    },
    /// Emitted once per `MessageId`, however many copies arrive
    Delivered(Delivery),
    Retransmitted {
        message_id: MessageId,
        destinations: BTreeSet<ProcessId>,
    },
    FullyAcknowledged {
        message_id: MessageId,
    },
    /// `multicast` was called in a group with no other member
    NoPeers {
        payload: String,
    },
}

/// Forwards `MulticastEvent`s to whoever holds the other end of the channel.
/// A gone receiver is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    event_tx: Sender<MulticastEvent>,
}

impl EventNotifier {
    /// Returns a new instance of `EventNotifier`
    #[must_use]
    pub fn new(event_tx: Sender<MulticastEvent>) -> Self {
        Self { event_tx }
    }

    pub fn send_event(&self, event: MulticastEvent) {
        if let Err(SendError(event)) = self.event_tx.send(event) {
            log::warn!("Nobody is listening for events, dropped {event:?}");
        }
    }
}
