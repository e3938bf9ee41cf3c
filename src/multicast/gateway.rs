use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;
use crate::error::TransportError;
use crate::packet::{AckMessage, MessageId, Packet};
use crate::transport::{PeerDirectory, Transport};
use crate::ProcessId;

/// Turns `Packet`s addressed to `ProcessId`s into datagrams on the `Transport`.
/// Send failures are logged and reported to the caller, never retried here.
pub struct Gateway {
    process_id: ProcessId,
    directory: PeerDirectory,
    transport: Arc<dyn Transport>,
}

impl Debug for Gateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("process_id", &self.process_id)
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Returns a new instance of `Gateway`
    pub fn new(process_id: ProcessId, directory: PeerDirectory, transport: Arc<dyn Transport>) -> Self {
        Self {
            process_id,
            directory,
            transport,
        }
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    /// Sends `packet` to a single group member
    /// # Return
    /// whether the transport accepted the datagram
    pub fn send_packet(&self, destination: ProcessId, packet: &Packet) -> bool {
        match packet.encode() {
            Ok(bytes) => self.send_encoded_checked(destination, &bytes, packet),
            Err(err) => {
                log::error!("Cannot encode {packet}: {err}");
                false
            }
        }
    }

    /// Sends the same `packet` to every id in `destinations`, encoding it once
    /// # Return
    /// the number of destinations the transport accepted the datagram for
    pub fn send_packet_to_all(&self, packet: &Packet, destinations: &BTreeSet<ProcessId>) -> usize {
        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("Cannot encode {packet}: {err}");
                return 0;
            }
        };

        destinations
            .iter()
            .filter(|destination| self.send_encoded_checked(**destination, &bytes, packet))
            .count()
    }

    /// Acknowledges `message_id` to `destination`
    pub fn send_ack(&self, destination: ProcessId, message_id: &MessageId) -> bool {
        let packet = Packet::Ack(AckMessage {
            sender_id: self.process_id,
            acked_message_id: message_id.clone(),
        });
        self.send_packet(destination, &packet)
    }

    /// Blocks until the next datagram arrives on the local endpoint
    /// # Errors
    /// Propagates the `TransportError`
    pub fn receive(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        self.transport.receive()
    }

    fn send_encoded(&self, destination: ProcessId, bytes: &[u8]) -> Result<(), TransportError> {
        let address = self
            .directory
            .lookup(destination)
            .ok_or(TransportError::UnknownPeer(destination))?;
        self.transport.send(address, bytes)
    }

    fn send_encoded_checked(&self, destination: ProcessId, bytes: &[u8], packet: &Packet) -> bool {
        match self.send_encoded(destination, bytes) {
            Ok(()) => {
                log::debug!("Packet {packet} sent to {destination}");
                true
            }
            Err(err) => {
                log::warn!("Error while sending packet {packet} to process {destination}: {err}");
                false
            }
        }
    }
}
