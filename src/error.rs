//! Error types for the multicast layer.

use std::net::SocketAddr;
use thiserror::Error;
use crate::ProcessId;

/// Failures of a single send or receive on the datagram transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport endpoint disconnected")]
    Disconnected,

    #[error("No address known for process {0}")]
    UnknownPeer(ProcessId),
}

/// A datagram that could not be turned into a `Packet`.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Datagram is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Startup failures. Nothing that happens after the loops are running ends up here.
#[derive(Error, Debug)]
pub enum MulticastError {
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Process {0} is not part of the group")]
    UnknownProcess(ProcessId),

    #[error("Cannot spawn thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, MulticastError>;
