//! Applies decoded messages to the entity registry.

use sync_shared::{Message, MessageBody, NULL_IDENTITY, NetworkIdentity};
use tracing::{debug, trace};

use crate::{
    entity::{EntityKind, NetworkedEntity},
    events::{BoltHit, HitSender},
    registry::EntityRegistry,
};

/// What applying one message did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// A remote player was created for the sender.
    Spawned(NetworkIdentity),
    /// CONNECT for an identity that is already tracked; nothing changed.
    AlreadyTracked(NetworkIdentity),
    /// The sender's entity was removed.
    Despawned(NetworkIdentity),
    PoseUpdated(NetworkIdentity),
    /// The referenced entity is not tracked (not created yet or already gone).
    TargetMissing(NetworkIdentity),
    BoltRemoved {
        bolt: NetworkIdentity,
        /// Whether the bolt was tracked locally.
        removed: bool,
        hit: Option<NetworkIdentity>,
    },
}

/// Per-kind rules for mutating the registry.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: EntityRegistry,
    hits: Option<HitSender>,
}

impl Reconciler {
    pub fn new(registry: EntityRegistry) -> Self {
        Self {
            registry,
            hits: None,
        }
    }

    /// Routes bolt hits to `hits`.
    pub fn with_hit_sender(mut self, hits: HitSender) -> Self {
        self.hits = Some(hits);
        self
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn apply(&self, message: &Message) -> Reconciliation {
        let sender = message.sender;
        match message.body {
            MessageBody::Connect => {
                if self
                    .registry
                    .insert_if_absent(NetworkedEntity::remote_player(sender))
                {
                    debug!(%sender, "remote player joined");
                    Reconciliation::Spawned(sender)
                } else {
                    debug!(%sender, "connect for already tracked identity ignored");
                    Reconciliation::AlreadyTracked(sender)
                }
            }
            MessageBody::Disconnect => {
                if self.registry.remove_by_identity(sender) {
                    debug!(%sender, "entity left");
                    Reconciliation::Despawned(sender)
                } else {
                    Reconciliation::TargetMissing(sender)
                }
            }
            MessageBody::UpdateLocalPlayer { pose } => {
                self.overwrite_pose(sender, EntityKind::is_player, pose.into())
            }
            MessageBody::Update { target, pose } => {
                self.overwrite_pose(target, |_| true, pose.into())
            }
            MessageBody::RemoveProjectile {
                projectile,
                hit_target,
            } => {
                let removed = self.registry.remove_by_identity(projectile);
                let hit = (hit_target != NULL_IDENTITY).then_some(hit_target);
                if let Some(target) = hit {
                    self.report_hit(BoltHit {
                        bolt: projectile,
                        target,
                    });
                }
                debug!(bolt = %projectile, removed, ?hit, "bolt removed");
                Reconciliation::BoltRemoved {
                    bolt: projectile,
                    removed,
                    hit,
                }
            }
        }
    }

    fn overwrite_pose(
        &self,
        target: NetworkIdentity,
        filter: impl Fn(EntityKind) -> bool,
        pose: crate::entity::Pose,
    ) -> Reconciliation {
        if self.registry.update_pose(target, filter, pose) {
            trace!(%target, ?pose, "pose overwritten");
            Reconciliation::PoseUpdated(target)
        } else {
            Reconciliation::TargetMissing(target)
        }
    }

    fn report_hit(&self, hit: BoltHit) {
        let Some(hits) = &self.hits else {
            return;
        };
        if hits.send(hit).is_err() {
            trace!(?hit, "hit receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Pose;
    use crate::events::hit_channel;
    use sync_shared::{Pose2, new_identity};

    fn reconciler() -> Reconciler {
        Reconciler::new(EntityRegistry::new())
    }

    #[test]
    fn connect_update_disconnect_walkthrough() {
        let reconciler = reconciler();
        let registry = reconciler.registry().clone();
        let id_a = new_identity();

        assert_eq!(
            reconciler.apply(&Message::connect(id_a)),
            Reconciliation::Spawned(id_a)
        );
        let joined = registry.find_by_identity(id_a).unwrap();
        assert_eq!(joined.kind, EntityKind::RemotePlayer);
        assert_eq!(joined.pose, Pose::default());

        let server = new_identity();
        reconciler.apply(&Message::update(server, id_a, Pose2::new(10.0, 20.0, 90.0)));
        assert_eq!(
            registry.find_by_identity(id_a).unwrap().pose,
            Pose::new(10.0, 20.0, 90.0)
        );

        assert_eq!(
            reconciler.apply(&Message::disconnect(id_a)),
            Reconciliation::Despawned(id_a)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_connect_does_not_reset_entity() {
        let reconciler = reconciler();
        let id = new_identity();
        reconciler.apply(&Message::connect(id));
        reconciler.apply(&Message::update(id, id, Pose2::new(3.0, 4.0, 5.0)));

        assert_eq!(
            reconciler.apply(&Message::connect(id)),
            Reconciliation::AlreadyTracked(id)
        );
        assert_eq!(reconciler.registry().len(), 1);
        assert_eq!(
            reconciler.registry().find_by_identity(id).unwrap().pose,
            Pose::new(3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn disconnect_of_unknown_is_noop() {
        let reconciler = reconciler();
        let id = new_identity();
        assert_eq!(
            reconciler.apply(&Message::disconnect(id)),
            Reconciliation::TargetMissing(id)
        );
    }

    #[test]
    fn update_local_player_only_touches_players() {
        let reconciler = reconciler();
        let registry = reconciler.registry();
        let bolt = new_identity();
        registry.insert(NetworkedEntity::bolt(bolt, Pose::default()));

        let pose = Pose2::new(1.0, 1.0, 1.0);
        assert_eq!(
            reconciler.apply(&Message::update_local_player(bolt, pose)),
            Reconciliation::TargetMissing(bolt)
        );
        assert_eq!(registry.find_by_identity(bolt).unwrap().pose, Pose::default());

        let player = new_identity();
        reconciler.apply(&Message::connect(player));
        assert_eq!(
            reconciler.apply(&Message::update_local_player(player, pose)),
            Reconciliation::PoseUpdated(player)
        );
        assert_eq!(registry.find_by_identity(player).unwrap().pose, Pose::from(pose));
    }

    #[test]
    fn update_targets_payload_identity_not_sender() {
        let reconciler = reconciler();
        let registry = reconciler.registry();
        let sender = new_identity();
        let bolt = new_identity();
        reconciler.apply(&Message::connect(sender));
        registry.insert(NetworkedEntity::bolt(bolt, Pose::default()));

        reconciler.apply(&Message::update(sender, bolt, Pose2::new(7.0, 8.0, 9.0)));
        assert_eq!(
            registry.find_by_identity(bolt).unwrap().pose,
            Pose::new(7.0, 8.0, 9.0)
        );
        assert_eq!(registry.find_by_identity(sender).unwrap().pose, Pose::default());
    }

    #[test]
    fn update_with_unknown_target_leaves_registry_unchanged() {
        let reconciler = reconciler();
        let registry = reconciler.registry();
        reconciler.apply(&Message::connect(new_identity()));
        let before = registry.snapshot();

        let ghost = new_identity();
        assert_eq!(
            reconciler.apply(&Message::update(new_identity(), ghost, Pose2::new(1.0, 2.0, 3.0))),
            Reconciliation::TargetMissing(ghost)
        );
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn remove_projectile_reports_exactly_one_hit() {
        let (tx, mut rx) = hit_channel();
        let reconciler = reconciler().with_hit_sender(tx);
        let bolt = new_identity();
        let target = new_identity();
        reconciler
            .registry()
            .insert(NetworkedEntity::bolt(bolt, Pose::default()));

        let outcome = reconciler.apply(&Message::remove_projectile(new_identity(), bolt, Some(target)));
        assert_eq!(
            outcome,
            Reconciliation::BoltRemoved {
                bolt,
                removed: true,
                hit: Some(target)
            }
        );
        assert!(!reconciler.registry().contains(bolt));
        assert_eq!(rx.try_recv().unwrap(), BoltHit { bolt, target });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn remove_projectile_without_target_is_silent() {
        let (tx, mut rx) = hit_channel();
        let reconciler = reconciler().with_hit_sender(tx);
        let bolt = new_identity();
        reconciler
            .registry()
            .insert(NetworkedEntity::bolt(bolt, Pose::default()));

        reconciler.apply(&Message::remove_projectile(new_identity(), bolt, None));
        assert!(reconciler.registry().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn hit_is_reported_even_if_bolt_unknown() {
        let (tx, mut rx) = hit_channel();
        let reconciler = reconciler().with_hit_sender(tx);
        let bolt = new_identity();
        let target = new_identity();

        let outcome = reconciler.apply(&Message::remove_projectile(new_identity(), bolt, Some(target)));
        assert!(matches!(
            outcome,
            Reconciliation::BoltRemoved { removed: false, .. }
        ));
        assert_eq!(rx.try_recv().unwrap(), BoltHit { bolt, target });
    }

    #[test]
    fn dropped_hit_receiver_is_not_an_error() {
        let (tx, rx) = hit_channel();
        drop(rx);
        let reconciler = reconciler().with_hit_sender(tx);
        let outcome = reconciler.apply(&Message::remove_projectile(
            new_identity(),
            new_identity(),
            Some(new_identity()),
        ));
        assert!(matches!(outcome, Reconciliation::BoltRemoved { .. }));
    }
}
