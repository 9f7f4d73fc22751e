use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use bevy_math::Vec2;
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use sync_client::{EntityKind, NetworkedEntity, SyncClient, SyncConfig};
use sync_shared::{
    Message, NetworkIdentity, Pose2, new_identity,
    transport::{LoopbackClientTransport, LoopbackPair, LoopbackServerTransport},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Parser)]
#[command(name = "sync_dev")]
#[command(about = "Runs a sync session against a scripted in-process peer")]
struct Args {
    /// Sync configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to render before shutting down
    #[arg(short, long, default_value_t = 180)]
    frames: u32,

    /// Number of remote players the peer connects
    #[arg(short, long, default_value_t = 2)]
    remotes: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    info!(?config, frames = args.frames, remotes = args.remotes, "starting sync_dev");

    let pair = LoopbackPair::with_client_id(new_identity());
    let bolt = new_identity();
    let peer = ScriptedPeer {
        client: pair.client.clone(),
        server: pair.server.clone(),
        identity: new_identity(),
        remotes: (0..args.remotes).map(|_| new_identity()).collect(),
        bolt,
    };
    let peer = thread::Builder::new()
        .name("scripted_peer".into())
        .spawn(move || peer.run())?;

    let mut client = SyncClient::start(&config, Arc::new(pair.client))?;
    let mut hits = client
        .take_hit_receiver()
        .ok_or_else(|| eyre!("hit receiver already taken"))?;

    let mut last = Instant::now();
    for frame in 0..args.frames {
        thread::sleep(FRAME);
        let delta = last.elapsed().as_secs_f32();
        last = Instant::now();

        let player = client.local_player();
        player.rotate_by(2.0);
        if let Some(velocity) = player.velocity() {
            player.translate(velocity * delta);
        }
        client.on_frame_render(delta);

        if frame == 30 {
            if let Some(pose) = player.pose() {
                client.registry().insert(NetworkedEntity::bolt(bolt, pose));
                info!(%bolt, "bolt fired");
            }
        }

        while let Ok(hit) = hits.try_recv() {
            info!(bolt = %hit.bolt, target = %hit.target, "bolt hit");
        }

        if frame % 60 == 0 {
            log_snapshot(&client);
        }
    }

    peer.join().map_err(|_| eyre!("scripted peer panicked"))??;
    log_snapshot(&client);
    info!(stats = ?client.stats(), "final stats");
    client.shutdown_blocking();
    Ok(())
}

fn log_snapshot(client: &SyncClient) {
    let registry = client.registry();
    info!(
        entities = registry.len(),
        remote_players = registry.count_kind(EntityKind::RemotePlayer),
        bolts = registry.count_kind(EntityKind::Bolt),
        local = ?client.local_player().pose(),
        "registry"
    );
}

/// Plays the server side: connects remotes, moves them, removes the bolt with a hit, leaves.
struct ScriptedPeer {
    client: LoopbackClientTransport,
    server: LoopbackServerTransport,
    identity: NetworkIdentity,
    remotes: Vec<NetworkIdentity>,
    bolt: NetworkIdentity,
}

impl ScriptedPeer {
    fn run(self) -> Result<()> {
        thread::sleep(Duration::from_millis(50));
        self.client.connect()?;
        info!(client = %self.server.client_id(), "peer connected client");

        for remote in &self.remotes {
            self.server.send_message(&Message::connect(*remote))?;
        }

        for step in 0..60u16 {
            for (i, remote) in self.remotes.iter().enumerate() {
                let angle = f32::from(step) * 6.0 + i as f32 * 90.0;
                let offset = Vec2::from_angle(angle.to_radians()) * 100.0;
                let pose = Pose2::new(250.0 + offset.x, 250.0 + offset.y, angle);
                self.server
                    .send_message(&Message::update(self.identity, *remote, pose))?;
            }
            thread::sleep(FRAME);
        }

        let target = self.remotes.first().copied();
        self.server
            .send_message(&Message::remove_projectile(self.identity, self.bolt, target))?;
        thread::sleep(Duration::from_millis(200));

        let upstream = self.server.drain_messages();
        info!(
            updates = upstream.len(),
            heartbeats = self.server.heartbeat_count(),
            "peer saw client traffic"
        );

        for remote in &self.remotes {
            self.server.send_message(&Message::disconnect(*remote))?;
        }
        Ok(())
    }
}
