use std::fmt;

use rand::Rng;
use thiserror::Error;
use tokio_tungstenite::tungstenite::{Bytes, Message, Utf8Bytes};

/// Signaling relay errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("connection registry is no longer running")]
    RegistryClosed,
}

/// Opaque handle for one live connection, allocated by the registry on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{:016x}", self.0)
    }
}

#[cfg(test)]
impl From<u64> for ConnId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A relayed message body. Never inspected, only cloned and forwarded.
///
/// Both variants wrap tungstenite's refcounted buffers, so fanning one
/// payload out to many peers costs a refcount bump per recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl Payload {
    /// Extract the relayable part of an inbound frame. Control frames yield `None`.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(Self::Text(text)),
            Message::Binary(data) => Some(Self::Binary(data)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }

    /// Turn the payload back into a frame of the same kind for sending.
    pub fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::Text(text),
            Self::Binary(data) => Message::Binary(data),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(Utf8Bytes::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_id_display_is_prefixed_hex() {
        let id = ConnId::from(0xabcd);
        assert_eq!(id.to_string(), "conn_000000000000abcd");
    }

    #[test]
    fn conn_id_generate_has_fixed_width() {
        let id = ConnId::generate();
        let rendered = id.to_string();
        assert!(rendered.starts_with("conn_"));
        assert_eq!(rendered.len(), 21);
    }

    #[test]
    fn conn_id_is_copy() {
        let id = ConnId::generate();
        let copy = id;
        assert_eq!(id, copy);
        assert_eq!(id.to_string(), copy.to_string());
    }

    #[test]
    fn text_frame_stays_text() {
        let msg = Message::Text(Utf8Bytes::from("offer:123".to_string()));
        let payload = Payload::from_message(msg.clone()).unwrap();
        assert_eq!(payload, Payload::from("offer:123".to_string()));
        assert_eq!(payload.into_message(), msg);
    }

    #[test]
    fn binary_frame_stays_binary() {
        let msg = Message::Binary(Bytes::from(vec![0u8, 159, 146, 150]));
        let payload = Payload::from_message(msg.clone()).unwrap();
        assert!(matches!(payload, Payload::Binary(_)));
        assert_eq!(payload.len(), 4);
        assert_eq!(payload.into_message(), msg);
    }

    #[test]
    fn control_frames_are_not_relayable() {
        assert!(Payload::from_message(Message::Ping(Bytes::new())).is_none());
        assert!(Payload::from_message(Message::Pong(Bytes::new())).is_none());
        assert!(Payload::from_message(Message::Close(None)).is_none());
    }

    #[test]
    fn empty_text_is_still_relayable() {
        let payload = Payload::from_message(Message::Text(Utf8Bytes::from(String::new()))).unwrap();
        assert!(payload.is_empty());
    }
}
