use std::mem::size_of;

/// Shared error types
pub mod error;
/// Binary wire protocol (message layout, encode/decode)
pub mod protocol;
/// Transport seam consumed by the client plus the in-memory loopback implementation
pub mod transport;

/// Identifies one networked entity (a client process, a remote player, a bolt).
///
/// Generated once when the entity is created and never changed afterwards.
pub type NetworkIdentity = uuid::Uuid;
pub const NETWORK_IDENTITY_LEN: usize = size_of::<NetworkIdentity>();

/// Reserved identity meaning "no entity", e.g. a bolt that hit nothing.
pub const NULL_IDENTITY: NetworkIdentity = uuid::Uuid::nil();

/// Generates a fresh random identity.
pub fn new_identity() -> NetworkIdentity {
    uuid::Uuid::new_v4()
}

pub use error::{DecodeError, TransportError};
pub use protocol::{Message, MessageBody, MessageKind, Pose2};
pub use transport::{ClientTransport, TransportResult};
