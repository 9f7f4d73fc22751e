//! Shared collection of locally known networked entities.
//!
//! The receive task writes into it while the frame loop reads it (and writes the
//! local player). Every operation takes the lock for its own duration only; no
//! guard ever escapes this module.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use sync_shared::NetworkIdentity;

use crate::entity::{EntityKind, NetworkedEntity, Pose};

/// Cloneable handle; clones share the same entities.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Arc<RwLock<HashMap<NetworkIdentity, NetworkedEntity>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Poison is ignored: every mutation is a single map operation or field overwrite.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<NetworkIdentity, NetworkedEntity>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<NetworkIdentity, NetworkedEntity>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `entity`, replacing and returning any entity with the same identity.
    pub fn insert(&self, entity: NetworkedEntity) -> Option<NetworkedEntity> {
        self.write().insert(entity.identity(), entity)
    }

    /// Inserts `entity` unless its identity is already tracked. Returns whether it was inserted.
    pub fn insert_if_absent(&self, entity: NetworkedEntity) -> bool {
        let mut entities = self.write();
        if entities.contains_key(&entity.identity()) {
            return false;
        }
        entities.insert(entity.identity(), entity);
        true
    }

    pub fn find_by_identity(&self, identity: NetworkIdentity) -> Option<NetworkedEntity> {
        self.read().get(&identity).cloned()
    }

    pub fn contains(&self, identity: NetworkIdentity) -> bool {
        self.read().contains_key(&identity)
    }

    /// Removes the entity; removing an unknown identity is a no-op.
    pub fn remove_by_identity(&self, identity: NetworkIdentity) -> bool {
        self.remove(identity).is_some()
    }

    pub fn remove(&self, identity: NetworkIdentity) -> Option<NetworkedEntity> {
        self.write().remove(&identity)
    }

    /// Overwrites the pose of `identity` if it is tracked and its kind passes `filter`.
    pub fn update_pose(
        &self,
        identity: NetworkIdentity,
        filter: impl Fn(EntityKind) -> bool,
        pose: Pose,
    ) -> bool {
        match self.write().get_mut(&identity) {
            Some(entity) if filter(entity.kind) => {
                entity.pose = pose;
                true
            }
            _ => false,
        }
    }

    /// Runs `f` against the entity under the write lock. Keep `f` short.
    pub fn with_entity_mut<R>(
        &self,
        identity: NetworkIdentity,
        f: impl FnOnce(&mut NetworkedEntity) -> R,
    ) -> Option<R> {
        self.write().get_mut(&identity).map(f)
    }

    /// Copies all entities out so the caller can iterate without holding the lock.
    pub fn snapshot(&self) -> Vec<NetworkedEntity> {
        self.read().values().cloned().collect()
    }

    /// Visits a copy of every entity. `f` runs without the lock held, so it may
    /// write back into the registry.
    pub fn for_each(&self, mut f: impl FnMut(&NetworkedEntity)) {
        for entity in self.snapshot() {
            f(&entity);
        }
    }

    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.read().values().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}
