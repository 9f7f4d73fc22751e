/*!
Receive loop (client)

Pulls frames from the transport, decodes them and hands them to the
[`Reconciler`]. Nothing that arrives over the wire can stop the loop; only
cancellation does.

Per iteration:
- not connected: back off for `disconnected_backoff`, touch nothing
- no frame ready: wait `poll_interval`
- transport error: warn, back off, continue
- undecodable frame: warn, count, drop, continue
- decoded frame: apply, then immediately poll again

All waits race against the cancellation token.

Logging Target:
- client::sync::receive
*/

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use sync_shared::{ClientTransport, DecodeError, Message, TransportError};
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::SyncConfig,
    reconcile::{Reconciler, Reconciliation},
    stats::SyncStats,
};

const LOG_TARGET: &str = "client::sync::receive";

/// Result of one poll of the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    NotConnected,
    /// Connected, but nothing was ready.
    Idle,
    Applied(Reconciliation),
    Dropped(DecodeError),
    TransportFailed,
}

impl PollOutcome {
    /// Whether a frame was consumed from the transport.
    pub fn consumed_frame(&self) -> bool {
        matches!(self, PollOutcome::Applied(_) | PollOutcome::Dropped(_))
    }
}

#[derive(Debug)]
pub struct ReceiveLoop {
    transport: Arc<dyn ClientTransport>,
    reconciler: Reconciler,
    stats: Arc<SyncStats>,
    poll_interval: Duration,
    disconnected_backoff: Duration,
    stats_interval: Option<Duration>,
}

impl ReceiveLoop {
    pub fn new(
        transport: Arc<dyn ClientTransport>,
        reconciler: Reconciler,
        stats: Arc<SyncStats>,
    ) -> Self {
        Self::from_config(transport, reconciler, stats, &SyncConfig::default())
    }

    pub fn from_config(
        transport: Arc<dyn ClientTransport>,
        reconciler: Reconciler,
        stats: Arc<SyncStats>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            transport,
            reconciler,
            stats,
            poll_interval: config.poll_interval(),
            disconnected_backoff: config.disconnected_backoff(),
            stats_interval: config.stats_log_interval(),
        }
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    /// Takes at most one frame from the transport and applies it.
    pub fn poll_once(&self) -> PollOutcome {
        if !self.transport.is_connected() {
            return PollOutcome::NotConnected;
        }

        let frame = match self.transport.receive_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!(target: LOG_TARGET, "no frame ready");
                return PollOutcome::Idle;
            }
            // Lost the connection between the check and the receive.
            Err(TransportError::NotReady) => return PollOutcome::NotConnected,
            Err(err) => {
                warn!(target: LOG_TARGET, %err, "transport receive failed");
                self.stats.record_transport_error();
                return PollOutcome::TransportFailed;
            }
        };
        self.stats.record_received();

        match Message::decode(&frame) {
            Ok(message) => {
                let outcome = self.reconciler.apply(&message);
                if let Reconciliation::TargetMissing(target) = outcome {
                    debug!(
                        target: LOG_TARGET,
                        kind = ?message.kind(),
                        %target,
                        "message skipped, entity not tracked"
                    );
                }
                self.stats.record_outcome(&outcome);
                PollOutcome::Applied(outcome)
            }
            Err(err) => {
                warn!(target: LOG_TARGET, %err, len = frame.len(), "dropping undecodable frame");
                self.stats.record_decode_failure(&err);
                PollOutcome::Dropped(err)
            }
        }
    }

    /// Drains every frame that is ready right now. Returns the number of frames consumed.
    pub fn pump(&self) -> usize {
        let mut consumed = 0;
        while self.poll_once().consumed_frame() {
            consumed += 1;
        }
        consumed
    }

    pub fn spawn(self, handle: &Handle, cancel: CancellationToken) -> JoinHandle<()> {
        handle.spawn(self.run(cancel))
    }

    /// Runs until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(target: LOG_TARGET, identity = %self.transport.local_identity(), "receive loop started");
        let mut last_dump = Instant::now();

        while !cancel.is_cancelled() {
            let wait = match self.poll_once() {
                PollOutcome::Applied(_) | PollOutcome::Dropped(_) => None,
                PollOutcome::Idle => Some(self.poll_interval),
                PollOutcome::NotConnected | PollOutcome::TransportFailed => {
                    Some(self.disconnected_backoff.max(self.poll_interval))
                }
            };

            if let Some(interval) = self.stats_interval {
                if last_dump.elapsed() >= interval {
                    self.stats.dump();
                    last_dump = Instant::now();
                }
            }

            match wait {
                Some(wait) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(wait) => {}
                    }
                }
                // Bursts must not starve other tasks on the runtime.
                None => tokio::task::yield_now().await,
            }
        }

        info!(target: LOG_TARGET, "receive loop stopped");
    }
}
