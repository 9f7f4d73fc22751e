//! Client-side entity synchronisation.
//!
//! A background task pulls frames from a [`ClientTransport`], decodes them and
//! reconciles them into a shared [`EntityRegistry`]. The frame loop reads the
//! registry, moves the [`LocalPlayer`] (whose changes are reported upstream) and
//! calls [`SyncClient::on_frame_render`] once per frame.

pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod receive;
pub mod reconcile;
pub mod registry;
pub mod reporter;
pub mod runtime;
pub mod session;
pub mod stats;

#[cfg(feature = "bevy")]
pub mod bevy;

#[cfg(test)]
mod testing;

pub use config::{SpawnConfig, SyncConfig};
pub use entity::{EntityKind, NetworkedEntity, Pose};
pub use error::{ClientError, ClientResult, ConfigError};
pub use events::{BoltHit, HitReceiver, HitSender, hit_channel};
pub use receive::{PollOutcome, ReceiveLoop};
pub use reconcile::{Reconciler, Reconciliation};
pub use registry::EntityRegistry;
pub use reporter::{LocalPlayer, LocalStateReporter};
pub use runtime::{ClientNetworkRuntime, RuntimeError};
pub use session::SyncClient;
pub use stats::{SyncStats, SyncStatsSnapshot};

pub use sync_shared::{ClientTransport, NetworkIdentity};
