//! Events the sync layer hands to game logic.

use sync_shared::NetworkIdentity;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// A bolt was removed after striking `target`. Damage is up to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoltHit {
    pub bolt: NetworkIdentity,
    pub target: NetworkIdentity,
}

pub type HitSender = UnboundedSender<BoltHit>;
pub type HitReceiver = UnboundedReceiver<BoltHit>;

pub fn hit_channel() -> (HitSender, HitReceiver) {
    unbounded_channel()
}
