//! Bevy ECS glue: the session as a resource plus per-frame systems.

use bevy_ecs::prelude::*;

use crate::{
    events::{BoltHit, HitReceiver},
    session::SyncClient,
};

#[derive(Resource)]
pub struct SyncClientResource {
    client: SyncClient,
    hits: Option<HitReceiver>,
}

impl SyncClientResource {
    pub fn new(mut client: SyncClient) -> Self {
        let hits = client.take_hit_receiver();
        Self { client, hits }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn into_inner(self) -> SyncClient {
        self.client
    }
}

/// Seconds since the previous frame, written by the host before the schedule runs.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FrameDelta(pub f32);

/// Hits collected this frame. Game logic reads and clears it.
#[derive(Resource, Debug, Default)]
pub struct PendingHits(pub Vec<BoltHit>);

pub fn frame_heartbeat_system(sync: Res<SyncClientResource>, delta: Option<Res<FrameDelta>>) {
    let delta = delta.map(|d| d.0).unwrap_or_default();
    sync.client.on_frame_render(delta);
}

pub fn collect_hits_system(mut sync: ResMut<SyncClientResource>, mut pending: ResMut<PendingHits>) {
    let Some(hits) = sync.hits.as_mut() else {
        return;
    };
    while let Ok(hit) = hits.try_recv() {
        pending.0.push(hit);
    }
}
