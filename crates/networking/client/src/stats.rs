/*!
Sync counters (client)

- Lock-free counters bumped by the receive task and the local reporter.
- `snapshot()` copies them into a plain struct for display or assertions.
- The receive task dumps a snapshot at trace level on a fixed cadence.

Logging Target:
- client::sync::stats
*/

use std::sync::atomic::{AtomicU64, Ordering};

use sync_shared::DecodeError;
use tracing::trace;

use crate::reconcile::Reconciliation;

#[derive(Debug, Default)]
pub struct SyncStats {
    frames_received: AtomicU64,
    applied: AtomicU64,
    malformed: AtomicU64,
    unknown_kind: AtomicU64,
    transport_errors: AtomicU64,
    target_misses: AtomicU64,
    hits_decoded: AtomicU64,
    reports_sent: AtomicU64,
    heartbeats_sent: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub frames_received: u64,
    pub applied: u64,
    pub malformed: u64,
    pub unknown_kind: u64,
    pub transport_errors: u64,
    pub target_misses: u64,
    /// REMOVE_PROJECTILE frames naming a target, counted whether or not a hit receiver is attached.
    pub hits_decoded: u64,
    pub reports_sent: u64,
    pub heartbeats_sent: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SyncStats {
    pub fn record_received(&self) {
        bump(&self.frames_received);
    }

    pub fn record_decode_failure(&self, err: &DecodeError) {
        if err.is_unknown_kind() {
            bump(&self.unknown_kind);
        } else {
            bump(&self.malformed);
        }
    }

    pub fn record_outcome(&self, outcome: &Reconciliation) {
        bump(&self.applied);
        match outcome {
            Reconciliation::TargetMissing(_) => bump(&self.target_misses),
            Reconciliation::BoltRemoved { hit: Some(_), .. } => bump(&self.hits_decoded),
            _ => {}
        }
    }

    pub fn record_transport_error(&self) {
        bump(&self.transport_errors);
    }

    pub fn record_report(&self) {
        bump(&self.reports_sent);
    }

    pub fn record_heartbeat(&self) {
        bump(&self.heartbeats_sent);
    }

    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown_kind: self.unknown_kind.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            target_misses: self.target_misses.load(Ordering::Relaxed),
            hits_decoded: self.hits_decoded.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
        }
    }

    pub fn dump(&self) {
        let s = self.snapshot();
        trace!(
            target: "client::sync::stats",
            "stats: rx={} applied={} malformed={} unknown={} tx_err={} misses={} hits_decoded={} reports={} heartbeats={}",
            s.frames_received,
            s.applied,
            s.malformed,
            s.unknown_kind,
            s.transport_errors,
            s.target_misses,
            s.hits_decoded,
            s.reports_sent,
            s.heartbeats_sent
        );
    }
}
