use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::DecodeError;
use crate::ProcessId;

/// Group-wide identifier of an originated message.
/// Uniqueness is assumed from random generation, it is never negotiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Returns a fresh random `MessageId`
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the first 8 characters, enough to tell messages apart in logs
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An application datagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMessage {
    pub sender_id: ProcessId,
    pub payload: String,
    pub message_id: MessageId,
    pub lamport_clock: u64,
    /// Informational only, never compared
    pub wall_clock: String,
}

/// Confirms that `sender_id` received `acked_message_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    pub sender_id: ProcessId,
    #[serde(rename = "payload")]
    pub acked_message_id: MessageId,
}

/// One datagram on the wire: a JSON object tagged by its `type` field.
///
/// Records with a `type` other than `MESSAGE` or `ACK` decode to `Packet::Unknown`
/// so the receiver can ignore them instead of treating them as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    #[serde(rename = "MESSAGE")]
    Message(DataMessage),
    #[serde(rename = "ACK")]
    Ack(AckMessage),
    #[serde(other)]
    Unknown,
}

impl Packet {
    /// Returns the UTF-8 JSON encoding of this `Packet`
    /// # Errors
    /// Only if `serde_json` refuses the record, which the derived impls never do
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parses a received datagram
    /// # Errors
    /// Returns a `DecodeError` if `bytes` is not UTF-8 or not a well-formed record
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the `ProcessId` that put this `Packet` on the wire, if known
    #[must_use]
    pub fn sender_id(&self) -> Option<ProcessId> {
        match self {
            Packet::Message(message) => Some(message.sender_id),
            Packet::Ack(ack) => Some(ack.sender_id),
            Packet::Unknown => None,
        }
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Packet::Message(message) => write!(
                f,
                "MESSAGE({}) from {} [LC: {}]",
                message.message_id.short(),
                message.sender_id,
                message.lamport_clock
            ),
            Packet::Ack(ack) => write!(f, "ACK({}) from {}", ack.acked_message_id.short(), ack.sender_id),
            Packet::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn message_wire_fields() {
        let packet = Packet::Message(DataMessage {
            sender_id: 3,
            payload: "hi".to_string(),
            message_id: MessageId::from("abc"),
            lamport_clock: 7,
            wall_clock: "2024-01-01T00:00:00".to_string(),
        });

        let value: Value = serde_json::from_slice(&packet.encode().unwrap()).unwrap();
        let expected = json!({
            "type": "MESSAGE",
            "sender_id": 3,
            "payload": "hi",
            "message_id": "abc",
            "lamport_clock": 7,
            "wall_clock": "2024-01-01T00:00:00",
        });
        assert_eq!(value, expected);
    }

    #[test]
    fn ack_carries_message_id_in_payload() {
        let packet = Packet::Ack(AckMessage {
            sender_id: 1,
            acked_message_id: MessageId::from("abc"),
        });

        let value: Value = serde_json::from_slice(&packet.encode().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "ACK", "sender_id": 1, "payload": "abc" }));
    }

    #[test]
    fn decode_ack_from_foreign_encoder() {
        let bytes = br#"{"type": "ACK", "sender_id": 2, "payload": "5f0c"}"#;
        let expected = Packet::Ack(AckMessage {
            sender_id: 2,
            acked_message_id: MessageId::from("5f0c"),
        });
        assert_eq!(Packet::decode(bytes).unwrap(), expected);
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let bytes = br#"{"type": "HEARTBEAT", "sender_id": 2}"#;
        let packet = Packet::decode(bytes).unwrap();
        assert_eq!(packet, Packet::Unknown);
        assert_eq!(packet.sender_id(), None);
    }

    #[test]
    fn malformed_datagrams() {
        assert!(matches!(Packet::decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(Packet::decode(&[0xff, 0xfe]), Err(DecodeError::Utf8(_))));

        // MESSAGE without its clock
        let bytes = br#"{"type": "MESSAGE", "sender_id": 2, "payload": "x", "message_id": "m", "wall_clock": ""}"#;
        assert!(matches!(Packet::decode(bytes), Err(DecodeError::Json(_))));
    }

    #[test]
    fn generated_ids_differ() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
        assert!(a.as_str().starts_with(a.short()));
    }

    #[test]
    fn short_id_of_short_token() {
        assert_eq!(MessageId::from("abc").short(), "abc");
    }
}
