use std::collections::{HashMap, HashSet};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use crate::error::{MulticastError, TransportError};
use crate::transport::Transport;

type Datagram = (Vec<u8>, SocketAddr);

/// An in-process datagram network.
///
/// Datagrams to unbound or unreachable addresses vanish silently, as they would on UDP.
/// With a loss probability set, every datagram is independently dropped with that probability.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    endpoints: RwLock<HashMap<SocketAddr, Sender<Datagram>>>,
    unreachable: RwLock<HashSet<SocketAddr>>,
    loss_probability: f64,
}

impl InMemoryNetwork {
    /// Returns a new lossless `InMemoryNetwork`
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a new `InMemoryNetwork` dropping each datagram with probability `loss_probability`
    #[must_use]
    pub fn with_loss(loss_probability: f64) -> Arc<Self> {
        Arc::new(Self {
            loss_probability: loss_probability.clamp(0.0, 1.0),
            ..Self::default()
        })
    }

    /// Creates the endpoint receiving datagrams addressed to `addr`
    /// # Errors
    /// Returns `MulticastError::Bind` if `addr` is already bound
    pub fn bind(self: &Arc<Self>, addr: SocketAddr) -> Result<MemoryEndpoint, MulticastError> {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        if endpoints.contains_key(&addr) {
            return Err(MulticastError::Bind {
                addr,
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }

        let (inbox_tx, inbox_rx) = unbounded();
        endpoints.insert(addr, inbox_tx);

        Ok(MemoryEndpoint {
            addr,
            network: Arc::clone(self),
            inbox: inbox_rx,
        })
    }

    /// Removes the endpoint bound to `addr`; its pending `receive` fails with `Disconnected`
    pub fn unbind(&self, addr: SocketAddr) {
        if self.endpoints.write().unwrap_or_else(PoisonError::into_inner).remove(&addr).is_none() {
            log::warn!("Cannot unbind {addr}: nothing is bound there");
        }
    }

    /// Makes every datagram addressed to `addr` vanish, or lets them through again
    pub fn set_reachable(&self, addr: SocketAddr, reachable: bool) {
        let mut unreachable = self.unreachable.write().unwrap_or_else(PoisonError::into_inner);
        if reachable {
            unreachable.remove(&addr);
        } else {
            unreachable.insert(addr);
        }
    }

    fn deliver(&self, source: SocketAddr, destination: SocketAddr, bytes: &[u8]) {
        if self.unreachable.read().unwrap_or_else(PoisonError::into_inner).contains(&destination) {
            log::debug!("Datagram from {source} to unreachable {destination} dropped");
            return;
        }

        if self.loss_probability > 0.0 && rand::rng().random_bool(self.loss_probability) {
            log::debug!("Datagram from {source} to {destination} lost");
            return;
        }

        let endpoints = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);
        let Some(inbox) = endpoints.get(&destination) else {
            log::debug!("Datagram from {source} to unbound {destination} dropped");
            return;
        };

        if inbox.send((bytes.to_vec(), source)).is_err() {
            log::debug!("Endpoint {destination} is gone, datagram from {source} dropped");
        }
    }
}

/// One bound address on an `InMemoryNetwork`
#[derive(Debug)]
pub struct MemoryEndpoint {
    addr: SocketAddr,
    network: Arc<InMemoryNetwork>,
    inbox: Receiver<Datagram>,
}

impl MemoryEndpoint {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits at most `timeout` for the next datagram
    #[must_use]
    pub fn receive_timeout(&self, timeout: Duration) -> Option<Datagram> {
        self.inbox.recv_timeout(timeout).ok()
    }
}

impl Transport for MemoryEndpoint {
    fn send(&self, destination: SocketAddr, bytes: &[u8]) -> Result<(), TransportError> {
        self.network.deliver(self.addr, destination, bytes);
        Ok(())
    }

    fn receive(&self) -> Result<Datagram, TransportError> {
        self.inbox.recv().map_err(|_| TransportError::Disconnected)
    }
}
