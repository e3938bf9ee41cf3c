use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use crate::error::{MulticastError, TransportError};
use crate::ProcessId;

pub mod memory;

/// An unreliable datagram transport: no ordering, delivery or duplication guarantees.
pub trait Transport: Send + Sync {
    /// Sends one datagram to `destination`
    /// # Errors
    /// Returns a `TransportError` if the datagram could not be handed to the network
    fn send(&self, destination: SocketAddr, bytes: &[u8]) -> Result<(), TransportError>;

    /// Blocks until the next datagram arrives
    /// # Errors
    /// Returns `TransportError::Disconnected` if no datagram can ever arrive again,
    /// any other `TransportError` for a failure limited to this receipt
    fn receive(&self) -> Result<(Vec<u8>, SocketAddr), TransportError>;
}

/// Static mapping from `ProcessId` to address, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerDirectory {
    peers: BTreeMap<ProcessId, SocketAddr>,
}

impl PeerDirectory {
    /// Returns a new instance of `PeerDirectory`
    pub fn new(peers: impl IntoIterator<Item = (ProcessId, SocketAddr)>) -> Self {
        Self {
            peers: peers.into_iter().collect(),
        }
    }

    /// Returns a directory of `total` processes, process `i` listening on `ip:(base_port + i)`.
    /// Ids whose port would not fit in a `u16` are left out.
    pub fn contiguous(ip: IpAddr, base_port: u16, total: u32) -> Self {
        let peers = (0..total).filter_map(|id| {
            let port = u16::try_from(id).ok().and_then(|offset| base_port.checked_add(offset));
            if port.is_none() {
                log::warn!("No port available for process {id} above base port {base_port}");
            }
            port.map(|port| (id, SocketAddr::new(ip, port)))
        });
        Self::new(peers)
    }

    #[must_use]
    pub fn lookup(&self, process_id: ProcessId) -> Option<SocketAddr> {
        self.peers.get(&process_id).copied()
    }

    #[must_use]
    pub fn contains(&self, process_id: ProcessId) -> bool {
        self.peers.contains_key(&process_id)
    }

    #[must_use]
    pub fn all_ids(&self) -> BTreeSet<ProcessId> {
        self.peers.keys().copied().collect()
    }

    /// Returns every member except `process_id`
    #[must_use]
    pub fn others(&self, process_id: ProcessId) -> BTreeSet<ProcessId> {
        self.peers
            .keys()
            .copied()
            .filter(|id| *id != process_id)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// `Transport` over a bound `UdpSocket`; outgoing datagrams leave from the same socket
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    max_datagram_size: usize,
}

impl UdpTransport {
    /// Binds the local receiving endpoint
    /// # Errors
    /// Returns `MulticastError::Bind` if the address is unavailable
    pub fn bind(addr: SocketAddr, max_datagram_size: usize) -> Result<Self, MulticastError> {
        let socket = UdpSocket::bind(addr).map_err(|source| MulticastError::Bind { addr, source })?;
        log::info!("Listening for datagrams on {addr}");
        Ok(Self { socket, max_datagram_size })
    }

    /// Returns the address the socket is actually bound to
    /// # Errors
    /// Propagates the socket error
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send(&self, destination: SocketAddr, bytes: &[u8]) -> Result<(), TransportError> {
        self.socket.send_to(bytes, destination)?;
        Ok(())
    }

    fn receive(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let mut buffer = vec![0; self.max_datagram_size];
        let (length, source) = self.socket.recv_from(&mut buffer)?;
        buffer.truncate(length);
        Ok((buffer, source))
    }
}
