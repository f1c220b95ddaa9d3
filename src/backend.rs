use crate::{
    ConfigError,
    Delivery,
    DeliveryClient,
    DeliveryConfig,
    HostConfig,
    HttpPostTransport,
    Transport,
};
use metrics_backend_librato_core::{
    reduce,
    sanitize,
    CounterLedger,
    FlushSnapshot,
    GaugeRecord,
    OutgoingPayload,
    NUM_STATS,
};
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

/// The lifecycle a host drives a flush backend through.
///
/// `flush` is called once per interval with the stats aggregated since the
/// previous call. It must not block, delivery happens in the background.
pub trait Backend {
    /// Build the backend from the host configuration. `None` means the
    /// backend is not configured and must not be registered.
    fn init(startup_time: i64, config: &HostConfig) -> Option<Self>
    where
        Self: Sized;

    fn flush(&mut self, timestamp: i64, snapshot: &FlushSnapshot) -> JoinHandle<Delivery>;

    /// Report introspection values, one `emit` call per key.
    fn stats(&self, emit: &mut dyn FnMut(&str, i64));

    /// Stop pending deliveries.
    fn shutdown(&mut self) {}
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Delivers flushes to the Librato metrics API.
pub struct LibratoBackend<T = HttpPostTransport> {
    ledger: CounterLedger,
    cycle: u64,
    source: Option<String>,
    debug: bool,
    delivery: DeliveryClient<T>,
}

impl LibratoBackend {
    pub fn new(startup_time: i64, config: &HostConfig) -> Result<Self, ConfigError> {
        let config = DeliveryConfig::resolve(config)?;
        let transport = HttpPostTransport::from_config(&config)?;
        info!(endpoint = %transport.endpoint().url(), source = ?config.source, "librato backend configured");
        Ok(Self::with_transport(startup_time, &config, transport))
    }
}

impl<T> LibratoBackend<T>
where
    T: Transport + Send + Sync + 'static,
{
    pub fn with_transport(startup_time: i64, config: &DeliveryConfig, transport: T) -> Self {
        Self {
            ledger: CounterLedger::new(config.legacy_counters),
            cycle: 0,
            source: config.source.clone(),
            debug: config.debug,
            delivery: DeliveryClient::new(transport, config, startup_time),
        }
    }

    /// Run one flush cycle: fold counters into the ledger, reduce timers and
    /// assemble the payload. Mutates the ledger even if the payload is never
    /// sent.
    pub fn build_payload(&mut self, timestamp: i64, snapshot: &FlushSnapshot) -> OutgoingPayload {
        self.cycle += 1;

        let mut gauges = snapshot
            .gauges
            .iter()
            .map(|(name, &value)| GaugeRecord::Plain {
                name: sanitize(name),
                value,
            })
            .collect::<Vec<_>>();
        gauges.extend(
            snapshot
                .timers
                .iter()
                .filter_map(|(name, samples)| reduce(name, samples)),
        );

        let deltas = snapshot
            .counters
            .iter()
            .filter(|(name, _)| name.as_str() != NUM_STATS)
            .map(|(name, &delta)| (name.as_str(), delta))
            .collect::<Vec<_>>();
        let num_stats = (gauges.len() + deltas.len()) as f64;
        let counters = self
            .ledger
            .apply(self.cycle, deltas.into_iter().chain([(NUM_STATS, num_stats)]));

        OutgoingPayload::encode(timestamp, gauges, counters, self.source.clone())
    }

    pub fn flush(&mut self, timestamp: i64, snapshot: &FlushSnapshot) -> JoinHandle<Delivery> {
        let payload = self.build_payload(timestamp, snapshot);
        if self.debug {
            debug!(
                gauges = payload.gauges.len(),
                counters = payload.counters.len(),
                %timestamp,
                "flushing metrics"
            );
        }
        self.delivery.deliver(&payload)
    }

    pub fn stats(&self, emit: &mut dyn FnMut(&str, i64)) {
        let state = self.delivery.state();
        emit("last_flush", state.last_flush.load(Ordering::Acquire));
        emit("last_exception", state.last_exception.load(Ordering::Acquire));
    }

    pub fn shutdown(&self) {
        self.delivery.shutdown();
    }

    pub fn ledger(&self) -> &CounterLedger {
        &self.ledger
    }
}

impl Backend for LibratoBackend {
    fn init(startup_time: i64, config: &HostConfig) -> Option<Self> {
        match LibratoBackend::new(startup_time, config) {
            Ok(backend) => Some(backend),
            Err(err) => {
                error!(%err, "librato backend not configured");
                None
            }
        }
    }

    fn flush(&mut self, timestamp: i64, snapshot: &FlushSnapshot) -> JoinHandle<Delivery> {
        LibratoBackend::flush(self, timestamp, snapshot)
    }

    fn stats(&self, emit: &mut dyn FnMut(&str, i64)) {
        LibratoBackend::stats(self, emit)
    }

    fn shutdown(&mut self) {
        LibratoBackend::shutdown(self)
    }
}
