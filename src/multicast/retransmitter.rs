use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use crate::multicast::event_notifier::{EventNotifier, MulticastEvent};
use crate::multicast::gateway::Gateway;
use crate::multicast::group_state::GroupState;
use crate::packet::Packet;

/// Periodically resends every pending message whose last send is older than the timeout,
/// only to the destinations that have not acknowledged it yet.
/// There is no retry limit: an unreachable peer is retried for as long as the process runs.
#[derive(Debug)]
pub struct Retransmitter {
    gateway: Arc<Gateway>,
    state: Arc<GroupState>,
    notifier: Arc<EventNotifier>,
    interval: Duration,
}

impl Retransmitter {
    /// Returns a new instance of `Retransmitter`
    pub fn new(gateway: Arc<Gateway>, state: Arc<GroupState>, notifier: Arc<EventNotifier>, interval: Duration) -> Self {
        Self {
            gateway,
            state,
            notifier,
            interval,
        }
    }

    /// Sleeps `interval`, sweeps, repeats. Never returns.
    pub fn run(&self) {
        loop {
            thread::sleep(self.interval);
            self.retransmit_expired(Instant::now());
        }
    }

    /// Resends every entry expired at `now`
    /// # Return
    /// the number of messages resent
    pub fn retransmit_expired(&self, now: Instant) -> usize {
        let expired = self.state.sweep(now);

        for (message, destinations) in &expired {
            let message_id = message.message_id.clone();
            log::info!(
                "Timeout for message {}, resending to {destinations:?}",
                message_id.short()
            );

            let packet = Packet::Message(message.clone());
            self.gateway.send_packet_to_all(&packet, destinations);

            // an ACK may have completed the entry while we were sending
            if self.state.touch(&message_id, now) {
                let event = MulticastEvent::Retransmitted {
                    message_id,
                    destinations: destinations.clone(),
                };
                self.notifier.send_event(event);
            }
        }

        expired.len()
    }
}
