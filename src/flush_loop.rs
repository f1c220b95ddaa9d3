use crate::{
    AggregatingRecorder,
    Backend,
    HostConfig,
    SnapshotHandle,
};
use metrics_backend_librato_core::util_time;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{
    CancellationToken,
    DropGuard,
};

/// Drives a [`Backend`] from an [`AggregatingRecorder`] on a fixed interval.
pub struct FlushLoop {
    flush_interval: Duration,
}

impl Default for FlushLoop {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(10),
        }
    }
}

impl FlushLoop {
    pub fn new() -> Self {
        Default::default()
    }

    /// Use the host's `flushInterval`.
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new().flush_interval(config.flush_interval())
    }

    /// Set the time between two flushes.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Start flushing in the background. Returns a guard that stops the loop
    /// and shuts the backend down when dropped. Must be called from within a
    /// Tokio runtime.
    pub fn start_with<B>(self, backend: B, recorder: &AggregatingRecorder) -> DropGuard
    where
        B: Backend + Send + 'static,
    {
        let snapshots = recorder.handle();
        let token = CancellationToken::new();

        tokio::spawn({
            let token = token.clone();
            async move {
                run_flush_loop(backend, snapshots, token, self.flush_interval).await;
            }
        });

        token.drop_guard()
    }
}

async fn run_flush_loop<B: Backend>(
    mut backend: B,
    snapshots: SnapshotHandle,
    token: CancellationToken,
    flush_interval: Duration,
) {
    debug!(?flush_interval, "starting flush loop");
    defer! {
        debug!("flush loop stopped");
    }

    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                break;
            }

            _ = ticker.tick() => {
                let snapshot = snapshots.snapshot();
                trace!(
                    counters = snapshot.counters.len(),
                    timers = snapshot.timers.len(),
                    gauges = snapshot.gauges.len(),
                    "flushing snapshot"
                );
                // delivery outcomes are logged by the backend
                drop(backend.flush(util_time::epoch_seconds(), &snapshot));
            }
        }
    }

    backend.shutdown();
}
