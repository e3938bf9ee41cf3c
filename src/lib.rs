//! Reliable multicast for a fixed group of processes over an unreliable datagram transport.
//!
//! Every originated message is stamped with a Lamport clock and resent until each other
//! member has acknowledged it; receivers acknowledge every copy and deliver each message once.

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
mod multicast;
pub mod packet;
pub mod transport;

/// Index of a group member, in `[0, N)`
pub type ProcessId = u32;

pub use config::MulticastConfig;
pub use error::{DecodeError, MulticastError, TransportError};
pub use multicast::{Delivery, EventNotifier, MulticastEvent, MulticastHandles, ReliableMulticast};
pub use packet::{MessageId, Packet};
pub use transport::memory::{InMemoryNetwork, MemoryEndpoint};
pub use transport::{PeerDirectory, Transport, UdpTransport};
