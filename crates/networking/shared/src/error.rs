use thiserror::Error;

use crate::protocol::MessageKind;

/// Reasons a raw frame could not be turned into a [`Message`](crate::Message).
///
/// Decoding never panics; every malformed input maps onto one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated frame: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },
    #[error("unknown message kind byte {0}")]
    UnknownKind(u8),
    #[error("{kind:?} declares {declared} payload bytes, expected {expected}")]
    LengthMismatch {
        kind: MessageKind,
        declared: usize,
        expected: usize,
    },
    #[error("{extra} trailing bytes after payload")]
    TrailingBytes { extra: usize },
}

impl DecodeError {
    /// True when the kind byte itself was not recognised.
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, DecodeError::UnknownKind(_))
    }
}

/// Generic transport level error surfaced to the sync layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not ready")]
    NotReady,
    #[error("transport closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other: {0}")]
    Other(String),
}
