//! Transport seam between the sync layer and whatever carries the frames.

use std::fmt::Debug;

use bytes::Bytes;

use crate::{NetworkIdentity, TransportError};

pub mod loopback;

pub use loopback::{LoopbackClientTransport, LoopbackError, LoopbackPair, LoopbackServerTransport};

pub type TransportResult<T> = Result<T, TransportError>;

/// Client-side view of a connection to the game server.
///
/// Framing below the message boundary is the transport's job: every call to
/// [`receive_next`](ClientTransport::receive_next) yields exactly one protocol frame.
/// All methods take `&self` so one transport can be shared between the receive
/// task and the frame loop.
pub trait ClientTransport: Send + Sync + Debug {
    fn is_connected(&self) -> bool;

    /// Returns the next complete frame, or `None` if nothing is ready. Never blocks.
    fn receive_next(&self) -> TransportResult<Option<Bytes>>;

    fn send(&self, frame: Bytes) -> TransportResult<()>;

    /// Keep-alive; cadence is owned by the transport.
    fn heartbeat(&self) -> TransportResult<()>;

    /// Identity assigned to this client process.
    fn local_identity(&self) -> NetworkIdentity;
}

impl<T: ClientTransport + ?Sized> ClientTransport for std::sync::Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn receive_next(&self) -> TransportResult<Option<Bytes>> {
        (**self).receive_next()
    }

    fn send(&self, frame: Bytes) -> TransportResult<()> {
        (**self).send(frame)
    }

    fn heartbeat(&self) -> TransportResult<()> {
        (**self).heartbeat()
    }

    fn local_identity(&self) -> NetworkIdentity {
        (**self).local_identity()
    }
}
