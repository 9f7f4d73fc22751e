//! Pushes local player changes upstream.
//!
//! Reporting is edge-triggered: a setter that leaves the pose unchanged sends
//! nothing. The registry lock is released before anything touches the transport.

use std::sync::Arc;

use bevy_math::Vec2;
use sync_shared::{ClientTransport, Message, NetworkIdentity};
use tracing::{debug, trace, warn};

use crate::{entity::Pose, registry::EntityRegistry, stats::SyncStats};

const LOG_TARGET: &str = "client::sync::report";

/// Sends local state to the transport. Failures are logged and counted, never returned.
#[derive(Debug, Clone)]
pub struct LocalStateReporter {
    transport: Arc<dyn ClientTransport>,
    stats: Arc<SyncStats>,
}

impl LocalStateReporter {
    pub fn new(transport: Arc<dyn ClientTransport>, stats: Arc<SyncStats>) -> Self {
        Self { transport, stats }
    }

    pub fn local_identity(&self) -> NetworkIdentity {
        self.transport.local_identity()
    }

    /// Sends UPDATE_LOCAL_PLAYER if connected. Returns whether a frame went out.
    pub fn report_pose(&self, pose: Pose) -> bool {
        if !self.transport.is_connected() {
            trace!(target: LOG_TARGET, "not connected, pose change kept local");
            return false;
        }

        let frame = Message::update_local_player(self.transport.local_identity(), pose.into()).encode();
        match self.transport.send(frame) {
            Ok(()) => {
                self.stats.record_report();
                true
            }
            Err(err) => {
                warn!(target: LOG_TARGET, %err, "failed to send local player update");
                self.stats.record_transport_error();
                false
            }
        }
    }

    /// Emits one heartbeat if connected.
    pub fn on_frame_render(&self, delta: f32) -> bool {
        if !self.transport.is_connected() {
            return false;
        }
        match self.transport.heartbeat() {
            Ok(()) => {
                trace!(target: LOG_TARGET, delta, "heartbeat");
                self.stats.record_heartbeat();
                true
            }
            Err(err) => {
                warn!(target: LOG_TARGET, %err, "heartbeat failed");
                self.stats.record_transport_error();
                false
            }
        }
    }
}

/// Handle to the player controlled by this process.
///
/// The pose lives in the shared registry; every setter writes there first and
/// reports afterwards.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    identity: NetworkIdentity,
    registry: EntityRegistry,
    reporter: LocalStateReporter,
}

impl LocalPlayer {
    pub fn new(identity: NetworkIdentity, registry: EntityRegistry, reporter: LocalStateReporter) -> Self {
        Self {
            identity,
            registry,
            reporter,
        }
    }

    pub fn identity(&self) -> NetworkIdentity {
        self.identity
    }

    /// Current pose, or `None` if the entity is no longer tracked.
    pub fn pose(&self) -> Option<Pose> {
        self.registry.find_by_identity(self.identity).map(|e| e.pose)
    }

    pub fn set_pose(&self, pose: Pose) -> bool {
        self.mutate(|current| *current = pose)
    }

    pub fn set_position(&self, position: Vec2) -> bool {
        self.mutate(|current| current.position = position)
    }

    pub fn set_rotation(&self, rotation: f32) -> bool {
        self.mutate(|current| current.rotation = rotation)
    }

    pub fn translate(&self, delta: Vec2) -> bool {
        self.mutate(|current| current.position += delta)
    }

    pub fn rotate_by(&self, degrees: f32) -> bool {
        self.mutate(|current| current.rotation += degrees)
    }

    pub fn speed(&self) -> Option<f32> {
        self.registry.find_by_identity(self.identity).map(|e| e.speed)
    }

    /// Speed is not part of the wire format, so this never reports.
    pub fn set_speed(&self, speed: f32) -> bool {
        self.registry
            .with_entity_mut(self.identity, |entity| entity.speed = speed)
            .is_some()
    }

    pub fn velocity(&self) -> Option<Vec2> {
        self.registry
            .find_by_identity(self.identity)
            .map(|e| e.velocity())
    }

    /// Applies `f` to the pose and reports if it changed. Returns whether it changed.
    fn mutate(&self, f: impl FnOnce(&mut Pose)) -> bool {
        let changed = self.registry.with_entity_mut(self.identity, |entity| {
            let before = entity.pose;
            f(&mut entity.pose);
            (entity.pose != before).then_some(entity.pose)
        });

        match changed {
            Some(Some(pose)) => {
                self.reporter.report_pose(pose);
                true
            }
            Some(None) => false,
            None => {
                debug!(target: LOG_TARGET, identity = %self.identity, "local player not tracked, change ignored");
                false
            }
        }
    }
}
