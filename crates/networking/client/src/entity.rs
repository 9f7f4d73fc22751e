//! Networked entities as seen by the client.

use bevy_math::Vec2;
use sync_shared::{NetworkIdentity, Pose2};

/// Movement speed players start with, in world units per step.
pub const DEFAULT_PLAYER_SPEED: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The player controlled by this process.
    LocalPlayer,
    /// A player controlled by another client.
    RemotePlayer,
    /// A short-lived projectile.
    Bolt,
}

impl EntityKind {
    pub fn is_player(self) -> bool {
        matches!(self, EntityKind::LocalPlayer | EntityKind::RemotePlayer)
    }
}

/// Position plus rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec2,
    pub rotation: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            rotation,
        }
    }

    /// Unit vector pointing along the rotation.
    pub fn heading(&self) -> Vec2 {
        let radians = self.rotation.to_radians();
        Vec2::new(radians.cos(), radians.sin())
    }
}

impl From<Pose2> for Pose {
    fn from(pose: Pose2) -> Self {
        Self::new(pose.x, pose.y, pose.rotation)
    }
}

impl From<Pose> for Pose2 {
    fn from(pose: Pose) -> Self {
        Pose2::new(pose.position.x, pose.position.y, pose.rotation)
    }
}

/// One entity participating in synchronisation.
///
/// The identity is fixed at construction; everything else may be overwritten
/// in place by reconciliation or by the local player handle.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkedEntity {
    identity: NetworkIdentity,
    pub kind: EntityKind,
    pub pose: Pose,
    pub speed: f32,
}

impl NetworkedEntity {
    pub fn new(identity: NetworkIdentity, kind: EntityKind, pose: Pose) -> Self {
        let speed = if kind.is_player() {
            DEFAULT_PLAYER_SPEED
        } else {
            0.0
        };
        Self {
            identity,
            kind,
            pose,
            speed,
        }
    }

    pub fn local_player(identity: NetworkIdentity, pose: Pose) -> Self {
        Self::new(identity, EntityKind::LocalPlayer, pose)
    }

    /// A freshly joined remote player at the default pose.
    pub fn remote_player(identity: NetworkIdentity) -> Self {
        Self::new(identity, EntityKind::RemotePlayer, Pose::default())
    }

    pub fn bolt(identity: NetworkIdentity, pose: Pose) -> Self {
        Self::new(identity, EntityKind::Bolt, pose)
    }

    pub fn identity(&self) -> NetworkIdentity {
        self.identity
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player()
    }

    /// Velocity relative to the entity's facing direction.
    pub fn velocity(&self) -> Vec2 {
        self.pose.heading() * self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_players_start_at_origin() {
        let id = sync_shared::new_identity();
        let entity = NetworkedEntity::remote_player(id);
        assert_eq!(entity.identity(), id);
        assert_eq!(entity.pose, Pose::default());
        assert_eq!(entity.speed, DEFAULT_PLAYER_SPEED);
        assert!(entity.is_player());
    }

    #[test]
    fn bolts_are_not_players() {
        let bolt = NetworkedEntity::bolt(sync_shared::new_identity(), Pose::default());
        assert!(!bolt.is_player());
        assert_eq!(bolt.velocity(), Vec2::ZERO);
    }

    #[test]
    fn velocity_follows_rotation() {
        let mut player = NetworkedEntity::local_player(
            sync_shared::new_identity(),
            Pose::new(0.0, 0.0, 90.0),
        );
        let v = player.velocity();
        assert!(v.x.abs() < 1e-4);
        assert!((v.y - DEFAULT_PLAYER_SPEED).abs() < 1e-4);

        player.pose.rotation = 180.0;
        player.speed = 2.0;
        assert!((player.velocity().x + 2.0).abs() < 1e-4);
    }

    #[test]
    fn pose_converts_to_wire_and_back() {
        let pose = Pose::new(1.5, -3.0, 270.0);
        let wire: Pose2 = pose.into();
        assert_eq!(wire, Pose2::new(1.5, -3.0, 270.0));
        assert_eq!(Pose::from(wire), pose);
    }
}
