//! A running sync session: registry, local player, receive task and hit events.

use std::sync::Arc;

use sync_shared::{ClientTransport, NetworkIdentity};
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::SyncConfig,
    entity::NetworkedEntity,
    error::ClientResult,
    events::{HitReceiver, hit_channel},
    receive::ReceiveLoop,
    reconcile::Reconciler,
    registry::EntityRegistry,
    reporter::{LocalPlayer, LocalStateReporter},
    runtime::ClientNetworkRuntime,
    stats::{SyncStats, SyncStatsSnapshot},
};

const LOG_TARGET: &str = "client::sync";

/// Owns the background receive task. Dropping the client cancels it.
#[derive(Debug)]
pub struct SyncClient {
    /// Only set when the session built its own runtime.
    runtime: Option<ClientNetworkRuntime>,
    handle: Handle,
    identity: NetworkIdentity,
    registry: EntityRegistry,
    local_player: LocalPlayer,
    reporter: LocalStateReporter,
    stats: Arc<SyncStats>,
    hits: Option<HitReceiver>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncClient {
    /// Starts a session on a dedicated multi-thread runtime.
    pub fn start(config: &SyncConfig, transport: Arc<dyn ClientTransport>) -> ClientResult<Self> {
        config.validate()?;
        let runtime = ClientNetworkRuntime::multi_thread(config.worker_threads)?;
        let handle = runtime.handle();
        let mut client = Self::build(handle, config, transport);
        client.runtime = Some(runtime);
        Ok(client)
    }

    /// Starts a session on an existing runtime.
    pub fn start_on(
        handle: Handle,
        config: &SyncConfig,
        transport: Arc<dyn ClientTransport>,
    ) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self::build(handle, config, transport))
    }

    fn build(handle: Handle, config: &SyncConfig, transport: Arc<dyn ClientTransport>) -> Self {
        let identity = transport.local_identity();
        let registry = EntityRegistry::new();
        let stats = Arc::new(SyncStats::default());

        let mut local = NetworkedEntity::local_player(identity, config.spawn_pose());
        local.speed = config.player_speed;
        registry.insert(local);

        let reporter = LocalStateReporter::new(Arc::clone(&transport), Arc::clone(&stats));
        let local_player = LocalPlayer::new(identity, registry.clone(), reporter.clone());

        let (hit_tx, hit_rx) = hit_channel();
        let reconciler = Reconciler::new(registry.clone()).with_hit_sender(hit_tx);
        let receive = ReceiveLoop::from_config(transport, reconciler, Arc::clone(&stats), config);

        let cancel = CancellationToken::new();
        let task = receive.spawn(&handle, cancel.clone());
        info!(target: LOG_TARGET, %identity, spawn = ?config.spawn_pose(), "sync session started");

        Self {
            runtime: None,
            handle,
            identity,
            registry,
            local_player,
            reporter,
            stats,
            hits: Some(hit_rx),
            cancel,
            task: Some(task),
        }
    }

    pub fn identity(&self) -> NetworkIdentity {
        self.identity
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn local_player(&self) -> &LocalPlayer {
        &self.local_player
    }

    /// Call once per rendered frame; emits a heartbeat if connected.
    pub fn on_frame_render(&self, delta: f32) -> bool {
        self.reporter.on_frame_render(delta)
    }

    /// Hit events; can only be taken once.
    pub fn take_hit_receiver(&mut self) -> Option<HitReceiver> {
        self.hits.take()
    }

    pub fn stats(&self) -> SyncStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Requests the receive task to stop without waiting for it.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stops the receive task and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(target: LOG_TARGET, %err, "receive task ended abnormally");
            }
        }
        info!(target: LOG_TARGET, identity = %self.identity, "sync session stopped");
    }

    /// Blocking variant of [`shutdown`](Self::shutdown). Must not be called from async code.
    pub fn shutdown_blocking(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let joined = match &self.runtime {
                Some(runtime) => runtime.block_on(task),
                None => self.handle.block_on(task),
            };
            if let Err(err) = joined {
                warn!(target: LOG_TARGET, %err, "receive task ended abnormally");
            }
        }
        info!(target: LOG_TARGET, identity = %self.identity, "sync session stopped");
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
