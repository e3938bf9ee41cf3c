use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use crate::config::MulticastConfig;
use crate::error::{MulticastError, Result};
use crate::multicast::dispatcher::Dispatcher;
use crate::multicast::gateway::Gateway;
use crate::multicast::group_state::GroupState;
use crate::multicast::retransmitter::Retransmitter;
use crate::packet::{MessageId, Packet};
use crate::transport::{PeerDirectory, Transport};
use crate::ProcessId;

mod dispatcher;
mod event_notifier;
mod gateway;
mod group_state;
mod retransmitter;

pub use event_notifier::{Delivery, EventNotifier, MulticastEvent};

/// Reliable multicast endpoint of one group member.
///
/// `multicast` is fire-and-forget: it returns as soon as the first copies are handed to the
/// transport, and the background threads started by `start` keep resending until every
/// destination has acknowledged. Deliveries and other notices arrive through the `EventNotifier`.
#[derive(Debug)]
pub struct ReliableMulticast {
    process_id: ProcessId,
    gateway: Arc<Gateway>,
    state: Arc<GroupState>,
    notifier: Arc<EventNotifier>,
    config: MulticastConfig,
}

/// Threads started by `ReliableMulticast::start`.
/// Neither finishes on its own while the transport stays connected.
#[derive(Debug)]
pub struct MulticastHandles {
    pub receiver: JoinHandle<()>,
    pub retransmitter: JoinHandle<()>,
}

impl ReliableMulticast {
    /// Returns a new instance of `ReliableMulticast`
    /// # Errors
    /// Returns `MulticastError::UnknownProcess` if `process_id` is not in `directory`
    pub fn new(
        process_id: ProcessId,
        directory: PeerDirectory,
        transport: Arc<dyn Transport>,
        notifier: Arc<EventNotifier>,
        config: MulticastConfig,
    ) -> Result<Self> {
        if !directory.contains(process_id) {
            return Err(MulticastError::UnknownProcess(process_id));
        }

        Ok(Self {
            process_id,
            gateway: Arc::new(Gateway::new(process_id, directory, transport)),
            state: Arc::new(GroupState::new(config.retransmission_timeout)),
            notifier,
            config,
        })
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    #[must_use]
    pub fn config(&self) -> &MulticastConfig {
        &self.config
    }

    /// Spawns the receiver and retransmitter threads
    /// # Errors
    /// Returns `MulticastError::Spawn` if the OS refuses a new thread
    pub fn start(&self) -> Result<MulticastHandles> {
        let dispatcher = Dispatcher::new(self.gateway.clone(), self.state.clone(), self.notifier.clone());
        let receiver = thread::Builder::new()
            .name(format!("receiver_{}", self.process_id))
            .spawn(move || dispatcher.run())
            .map_err(MulticastError::Spawn)?;

        let retransmitter = Retransmitter::new(
            self.gateway.clone(),
            self.state.clone(),
            self.notifier.clone(),
            self.config.retransmission_interval,
        );
        let retransmitter = thread::Builder::new()
            .name(format!("retransmitter_{}", self.process_id))
            .spawn(move || retransmitter.run())
            .map_err(MulticastError::Spawn)?;

        log::info!("Process {} online, group of {}", self.process_id, self.gateway.directory().len());
        Ok(MulticastHandles { receiver, retransmitter })
    }

    /// Reliably multicasts `payload` to every other group member.
    ///
    /// Send failures are only logged: recovery is left to the retransmitter.
    /// # Return
    /// the `MessageId` of the new message, `None` if the group has no other member
    /// or the local Lamport clock is exhausted
    pub fn multicast(&self, payload: &str) -> Option<MessageId> {
        let destinations = self.gateway.directory().others(self.process_id);
        if destinations.is_empty() {
            log::info!("Process {}: no other process in the group, nothing sent", self.process_id);
            self.notifier.send_event(MulticastEvent::NoPeers {
                payload: payload.to_string(),
            });
            return None;
        }

        let Some(message) = self.state.originate(self.process_id, payload, destinations.clone(), Instant::now()) else {
            log::error!("Process {}: Lamport clock exhausted, cannot originate a message", self.process_id);
            return None;
        };
        let message_id = message.message_id.clone();
        let lamport_clock = message.lamport_clock;
        log::info!(
            "Process {} multicasting {} [LC: {lamport_clock}] to {destinations:?}",
            self.process_id,
            message_id.short()
        );

        // emitted before any copy leaves, so it always precedes the matching FullyAcknowledged
        self.notifier.send_event(MulticastEvent::Sent {
            message_id: message_id.clone(),
            lamport_clock,
            payload: payload.to_string(),
            destinations: destinations.clone(),
        });

        let sent = self.gateway.send_packet_to_all(&Packet::Message(message), &destinations);
        if sent < destinations.len() {
            log::warn!(
                "Message {} reached the transport for {sent} of {} destinations, leaving the rest to retransmission",
                message_id.short(),
                destinations.len()
            );
        }

        Some(message_id)
    }

    /// Current local Lamport clock
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.state.clock()
    }

    /// Number of originated messages still missing at least one ACK
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.pending_count()
    }

    #[must_use]
    pub fn is_pending(&self, message_id: &MessageId) -> bool {
        self.state.is_pending(message_id)
    }

    /// Destinations that still owe an ACK for `message_id`, `None` once fully acknowledged
    #[must_use]
    pub fn acks_needed(&self, message_id: &MessageId) -> Option<BTreeSet<ProcessId>> {
        self.state.acks_needed(message_id)
    }

    /// Number of distinct messages delivered to the application so far
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.state.delivered_count()
    }

    #[must_use]
    pub fn has_delivered(&self, message_id: &MessageId) -> bool {
        self.state.has_delivered(message_id)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use crossbeam_channel::{unbounded, Receiver};
    use ntest::timeout;
    use crate::packet::AckMessage;
    use crate::transport::memory::{InMemoryNetwork, MemoryEndpoint};
    use super::*;

    fn create_multicast(total: u32) -> (ReliableMulticast, Receiver<MulticastEvent>, Vec<MemoryEndpoint>) {
        let network = InMemoryNetwork::new();
        let directory = PeerDirectory::contiguous(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000, total);
        let own = network.bind(directory.lookup(0).unwrap()).unwrap();
        let peers = (1..total)
            .map(|id| network.bind(directory.lookup(id).unwrap()).unwrap())
            .collect();

        let (event_tx, event_rx) = unbounded();
        let notifier = Arc::new(EventNotifier::new(event_tx));
        let multicast = ReliableMulticast::new(0, directory, Arc::new(own), notifier, MulticastConfig::default()).unwrap();

        (multicast, event_rx, peers)
    }

    #[test]
    fn rejects_process_outside_group() {
        let network = InMemoryNetwork::new();
        let directory = PeerDirectory::contiguous(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000, 2);
        let own = network.bind(directory.lookup(0).unwrap()).unwrap();
        let (event_tx, _event_rx) = unbounded();

        let result = ReliableMulticast::new(
            5,
            directory,
            Arc::new(own),
            Arc::new(EventNotifier::new(event_tx)),
            MulticastConfig::default(),
        );
        assert!(matches!(result, Err(MulticastError::UnknownProcess(5))));
    }

    #[test]
    fn multicast_stamps_registers_and_sends() {
        let (multicast, event_rx, peers) = create_multicast(3);

        let message_id = multicast.multicast("hi").unwrap();

        assert_eq!(multicast.clock(), 1);
        assert_eq!(multicast.acks_needed(&message_id), Some(BTreeSet::from([1, 2])));

        for peer in &peers {
            let (bytes, _) = peer.receive_timeout(Duration::from_millis(500)).unwrap();
            let Packet::Message(message) = Packet::decode(&bytes).unwrap() else {
                panic!("expected a MESSAGE");
            };
            assert_eq!(message.message_id, message_id);
            assert_eq!(message.sender_id, 0);
            assert_eq!(message.payload, "hi");
            assert_eq!(message.lamport_clock, 1);
        }

        let expected = MulticastEvent::Sent {
            message_id,
            lamport_clock: 1,
            payload: "hi".to_string(),
            destinations: BTreeSet::from([1, 2]),
        };
        assert_eq!(event_rx.try_recv().unwrap(), expected);
    }

    #[test]
    #[timeout(2000)]
    fn sent_is_reported_before_full_acknowledgement() {
        let (multicast, event_rx, peers) = create_multicast(2);
        multicast.start().unwrap();

        let message_id = multicast.multicast("hi").unwrap();

        let (_, own_addr) = peers[0].receive_timeout(Duration::from_millis(500)).unwrap();
        let ack = Packet::Ack(AckMessage {
            sender_id: 1,
            acked_message_id: message_id.clone(),
        });
        peers[0].send(own_addr, &ack.encode().unwrap()).unwrap();

        assert!(matches!(event_rx.recv().unwrap(), MulticastEvent::Sent { .. }));
        assert_eq!(event_rx.recv().unwrap(), MulticastEvent::FullyAcknowledged { message_id });
    }

    #[test]
    fn clock_strictly_increases_across_multicasts() {
        let (multicast, _event_rx, _peers) = create_multicast(2);

        let mut last = multicast.clock();
        for _ in 0..10 {
            multicast.multicast("x");
            assert!(multicast.clock() > last);
            last = multicast.clock();
        }
        assert_eq!(multicast.pending_count(), 10);
    }

    #[test]
    fn alone_in_group_is_a_no_op() {
        let (multicast, event_rx, _peers) = create_multicast(1);

        assert_eq!(multicast.multicast("hi"), None);
        assert_eq!(multicast.pending_count(), 0);
        assert_eq!(multicast.clock(), 0);
        assert_eq!(
            event_rx.try_recv().unwrap(),
            MulticastEvent::NoPeers { payload: "hi".to_string() }
        );
    }
}
