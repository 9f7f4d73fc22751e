//! Loopback transport for in-memory client-server communication.
//!
//! Keeps both ends in the same process without touching the network stack.
//! The server half plays the game server: it pushes frames to the client,
//! drains whatever the client reported, and observes heartbeats. Used for
//! local runs and tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use tracing::warn;
use uuid::uuid;

use crate::{Message, NetworkIdentity, TransportError};

use super::{ClientTransport, TransportResult};

/// Default client identity used by the loopback transport.
pub const LOOPBACK_CLIENT_ID: NetworkIdentity = uuid!("67e55044-10b1-426f-9247-bb680e5fe0c8");

/// Error type for loopback transport operations.
#[derive(Debug, thiserror::Error)]
pub enum LoopbackError {
    #[error("loopback transport not connected")]
    NotConnected,
    #[error("loopback transport already connected")]
    AlreadyConnected,
}

impl From<LoopbackError> for TransportError {
    fn from(err: LoopbackError) -> Self {
        match err {
            LoopbackError::NotConnected => TransportError::NotReady,
            LoopbackError::AlreadyConnected => {
                TransportError::Other("loopback transport already connected".into())
            }
        }
    }
}

#[derive(Debug)]
struct SharedLoopbackState {
    connected: AtomicBool,
    client_id: NetworkIdentity,
    client_to_server: Mutex<VecDeque<Bytes>>,
    server_to_client: Mutex<VecDeque<Bytes>>,
    heartbeats: AtomicU64,
}

impl SharedLoopbackState {
    fn new(client_id: NetworkIdentity) -> Self {
        Self {
            connected: AtomicBool::new(false),
            client_id,
            client_to_server: Mutex::new(VecDeque::new()),
            server_to_client: Mutex::new(VecDeque::new()),
            heartbeats: AtomicU64::new(0),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), LoopbackError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(LoopbackError::NotConnected)
        }
    }
}

/// A pair of connected loopback transports (client and server halves).
pub struct LoopbackPair {
    pub client: LoopbackClientTransport,
    pub server: LoopbackServerTransport,
}

impl LoopbackPair {
    /// Creates a new loopback transport pair using [`LOOPBACK_CLIENT_ID`].
    pub fn new() -> Self {
        Self::with_client_id(LOOPBACK_CLIENT_ID)
    }

    /// Creates a pair whose client half reports `client_id` as its local identity.
    pub fn with_client_id(client_id: NetworkIdentity) -> Self {
        let state = Arc::new(SharedLoopbackState::new(client_id));
        Self {
            client: LoopbackClientTransport {
                state: Arc::clone(&state),
            },
            server: LoopbackServerTransport { state },
        }
    }
}

impl Default for LoopbackPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side loopback transport implementation.
#[derive(Clone)]
pub struct LoopbackClientTransport {
    state: Arc<SharedLoopbackState>,
}

impl LoopbackClientTransport {
    pub fn connect(&self) -> Result<(), LoopbackError> {
        self.state
            .connected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| LoopbackError::AlreadyConnected)
    }

    pub fn disconnect(&self) -> Result<(), LoopbackError> {
        self.state
            .connected
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| LoopbackError::NotConnected)
    }
}

impl std::fmt::Debug for LoopbackClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackClientTransport")
            .field("client_id", &self.state.client_id)
            .field("connected", &self.state.is_connected())
            .finish()
    }
}

impl ClientTransport for LoopbackClientTransport {
    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn receive_next(&self) -> TransportResult<Option<Bytes>> {
        self.state.ensure_connected()?;
        let mut queue = self
            .state
            .server_to_client
            .lock()
            .map_err(|_| TransportError::Other("loopback queue poisoned".into()))?;
        Ok(queue.pop_front())
    }

    fn send(&self, frame: Bytes) -> TransportResult<()> {
        self.state.ensure_connected()?;
        if let Ok(mut queue) = self.state.client_to_server.lock() {
            queue.push_back(frame);
        }
        Ok(())
    }

    fn heartbeat(&self) -> TransportResult<()> {
        self.state.ensure_connected()?;
        self.state.heartbeats.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn local_identity(&self) -> NetworkIdentity {
        self.state.client_id
    }
}

/// Server-side loopback half, standing in for the game server.
#[derive(Clone)]
pub struct LoopbackServerTransport {
    state: Arc<SharedLoopbackState>,
}

impl LoopbackServerTransport {
    /// Returns the identity of the loopback client.
    pub fn client_id(&self) -> NetworkIdentity {
        self.state.client_id
    }

    /// Queues a raw frame for the client.
    pub fn send(&self, frame: Bytes) -> Result<(), LoopbackError> {
        self.state.ensure_connected()?;
        if let Ok(mut queue) = self.state.server_to_client.lock() {
            queue.push_back(frame);
        }
        Ok(())
    }

    /// Encodes and queues a message for the client.
    pub fn send_message(&self, message: &Message) -> Result<(), LoopbackError> {
        self.send(message.encode())
    }

    /// Number of frames queued for the client and not yet received.
    pub fn pending_for_client(&self) -> usize {
        self.state
            .server_to_client
            .lock()
            .map(|queue| queue.len())
            .unwrap_or_default()
    }

    /// Drains the raw frames sent by the client, oldest first.
    pub fn drain_received(&self) -> Vec<Bytes> {
        if let Ok(mut queue) = self.state.client_to_server.lock() {
            return queue.drain(..).collect();
        }

        Vec::new()
    }

    /// Drains and decodes the client's frames. Malformed frames are dropped with a warning.
    pub fn drain_messages(&self) -> Vec<Message> {
        self.drain_received()
            .into_iter()
            .filter_map(|frame| match Message::decode(&frame) {
                Ok(message) => Some(message),
                Err(err) => {
                    warn!("loopback server dropped malformed client frame: {err}");
                    None
                }
            })
            .collect()
    }

    /// Total heartbeats the client has emitted.
    pub fn heartbeat_count(&self) -> u64 {
        self.state.heartbeats.load(Ordering::Relaxed)
    }

    /// Forces the loopback client to disconnect.
    pub fn force_disconnect(&self) -> Result<(), LoopbackError> {
        self.state
            .connected
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| LoopbackError::NotConnected)
    }
}

impl std::fmt::Debug for LoopbackServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackServerTransport")
            .field("client_id", &self.state.client_id)
            .field("connected", &self.state.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pose2;

    fn connected_pair() -> LoopbackPair {
        let pair = LoopbackPair::new();
        pair.client.connect().unwrap();
        pair
    }

    #[test]
    fn test_loopback_connect_lifecycle() {
        let pair = LoopbackPair::new();
        assert!(!pair.client.is_connected());

        pair.client.connect().unwrap();
        assert!(pair.client.is_connected());
        assert!(matches!(
            pair.client.connect(),
            Err(LoopbackError::AlreadyConnected)
        ));

        pair.client.disconnect().unwrap();
        assert!(!pair.client.is_connected());
        assert!(matches!(
            pair.client.disconnect(),
            Err(LoopbackError::NotConnected)
        ));
    }

    #[test]
    fn test_loopback_send_roundtrip() {
        let pair = connected_pair();

        pair.server
            .send_message(&Message::connect(LOOPBACK_CLIENT_ID))
            .unwrap();
        let frame = pair.client.receive_next().unwrap().expect("frame");
        assert_eq!(
            Message::decode(&frame).unwrap(),
            Message::connect(LOOPBACK_CLIENT_ID)
        );
        assert!(pair.client.receive_next().unwrap().is_none());

        let report = Message::update_local_player(LOOPBACK_CLIENT_ID, Pose2::new(1.0, 2.0, 3.0));
        pair.client.send(report.encode()).unwrap();
        assert_eq!(pair.server.drain_messages(), vec![report]);
        assert!(pair.server.drain_received().is_empty());
    }

    #[test]
    fn test_malformed_client_frames_are_dropped() {
        let pair = connected_pair();
        pair.client.send(Bytes::from_static(b"junk")).unwrap();
        assert!(pair.server.drain_messages().is_empty());
    }

    #[test]
    fn test_heartbeats_are_counted() {
        let pair = connected_pair();
        pair.client.heartbeat().unwrap();
        pair.client.heartbeat().unwrap();
        assert_eq!(pair.server.heartbeat_count(), 2);
    }

    #[test]
    fn test_disconnected_client_rejects_io() {
        let pair = LoopbackPair::new();
        assert!(matches!(
            pair.client.send(Bytes::new()),
            Err(TransportError::NotReady)
        ));
        assert!(matches!(
            pair.client.heartbeat(),
            Err(TransportError::NotReady)
        ));
        assert!(matches!(
            pair.server.send(Bytes::new()),
            Err(LoopbackError::NotConnected)
        ));
    }

    #[test]
    fn test_force_disconnect() {
        let pair = connected_pair();
        pair.server.force_disconnect().unwrap();
        assert!(!pair.client.is_connected());
        assert!(pair.server.force_disconnect().is_err());
    }

    #[test]
    fn test_custom_client_id() {
        let id = crate::new_identity();
        let pair = LoopbackPair::with_client_id(id);
        assert_eq!(pair.client.local_identity(), id);
        assert_eq!(pair.server.client_id(), id);
    }
}
