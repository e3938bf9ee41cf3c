use std::net::SocketAddr;
use std::sync::Arc;
use crate::error::TransportError;
use crate::multicast::event_notifier::{Delivery, EventNotifier, MulticastEvent};
use crate::multicast::gateway::Gateway;
use crate::multicast::group_state::{AckOutcome, Acceptance, GroupState};
use crate::packet::{AckMessage, DataMessage, Packet};

/// Receiver loop: decodes every inbound datagram and routes it to message or ACK handling
#[derive(Debug)]
pub struct Dispatcher {
    gateway: Arc<Gateway>,
    state: Arc<GroupState>,
    notifier: Arc<EventNotifier>,
}

impl Dispatcher {
    /// Returns a new instance of `Dispatcher`
    pub fn new(gateway: Arc<Gateway>, state: Arc<GroupState>, notifier: Arc<EventNotifier>) -> Self {
        Self {
            gateway,
            state,
            notifier,
        }
    }

    /// Blocks on the transport forever. Returns only if the endpoint disconnects.
    pub fn run(&self) {
        loop {
            match self.gateway.receive() {
                Ok((bytes, source)) => self.handle_datagram(&bytes, source),
                Err(TransportError::Disconnected) => {
                    log::error!("Process {}: transport disconnected, receiver stopped", self.gateway.process_id());
                    break;
                }
                Err(err) => {
                    log::warn!("Process {}: error while receiving: {err}", self.gateway.process_id());
                }
            }
        }
    }

    /// Processes one raw datagram. Malformed ones are logged and dropped.
    pub fn handle_datagram(&self, bytes: &[u8], source: SocketAddr) {
        match Packet::decode(bytes) {
            Ok(packet) => {
                if let Some(sender_id) = packet.sender_id() {
                    log::trace!(
                        "Process {}: {packet} from {source}, claims process {sender_id}",
                        self.gateway.process_id()
                    );
                }
                self.dispatch(packet, source);
            }
            Err(err) => {
                log::warn!("Dropping malformed datagram from {source}: {err}");
            }
        }
    }

    fn dispatch(&self, packet: Packet, source: SocketAddr) {
        match packet {
            Packet::Message(message) => self.process_message(message),
            Packet::Ack(ack) => self.process_ack(&ack),
            Packet::Unknown => {
                log::debug!("Ignoring datagram of unknown type from {source}");
            }
        }
    }

    /// Acknowledges every copy, delivers only the first one
    fn process_message(&self, message: DataMessage) {
        let sender_id = message.sender_id;
        if !self.gateway.directory().contains(sender_id) {
            log::warn!("Dropping message {} from unknown process {sender_id}", message.message_id.short());
            return;
        }
        // no clock can be merged past this value
        if message.lamport_clock == u64::MAX {
            log::warn!(
                "Dropping message {} from {sender_id}: Lamport clock {} out of range",
                message.message_id.short(),
                message.lamport_clock
            );
            return;
        }

        self.gateway.send_ack(sender_id, &message.message_id);

        let local_clock = match self.state.accept(&message) {
            Acceptance::Deliver { local_clock } => local_clock,
            Acceptance::Duplicate => {
                log::debug!("Duplicate message {} from {sender_id} ignored", message.message_id.short());
                return;
            }
            Acceptance::ClockExhausted => {
                log::error!(
                    "Process {}: Lamport clock exhausted, message {} from {sender_id} not delivered",
                    self.gateway.process_id(),
                    message.message_id.short()
                );
                return;
            }
        };

        log::info!(
            "Delivering message {} from {sender_id} [sender LC: {}, local LC: {local_clock}]",
            message.message_id.short(),
            message.lamport_clock
        );

        let delivery = Delivery {
            sender_id,
            payload: message.payload,
            message_id: message.message_id,
            sender_clock: message.lamport_clock,
            local_clock,
            wall_clock: message.wall_clock,
        };
        self.notifier.send_event(MulticastEvent::Delivered(delivery));
    }

    fn process_ack(&self, ack: &AckMessage) {
        match self.state.on_ack(&ack.acked_message_id, ack.sender_id) {
            AckOutcome::Completed => {
                log::info!("All ACKs received for {}", ack.acked_message_id.short());
                let event = MulticastEvent::FullyAcknowledged {
                    message_id: ack.acked_message_id.clone(),
                };
                self.notifier.send_event(event);
            }
            AckOutcome::Progress { remaining } => {
                log::debug!(
                    "ACK from {} for {}, {remaining} still missing",
                    ack.sender_id,
                    ack.acked_message_id.short()
                );
            }
            AckOutcome::Ignored => {
                log::debug!("Stale ACK from {} for {} ignored", ack.sender_id, ack.acked_message_id.short());
            }
        }
    }
}
