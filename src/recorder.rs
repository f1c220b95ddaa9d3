use metrics::{
    Counter,
    CounterFn,
    Gauge,
    GaugeFn,
    Histogram,
    HistogramFn,
    Key,
    KeyName,
    Metadata,
    Recorder,
    SetRecorderError,
    SharedString,
    Unit,
};
use metrics_backend_librato_core::FlushSnapshot;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Stats aggregated since the last snapshot. Counters and histogram samples
/// are handed out and reset on every snapshot, gauges keep their last value.
#[derive(Default)]
struct Registry {
    current: Mutex<FlushSnapshot>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, FlushSnapshot> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> FlushSnapshot {
        let mut current = self.lock();
        FlushSnapshot {
            counters: std::mem::take(&mut current.counters),
            timers: std::mem::take(&mut current.timers),
            gauges: current.gauges.clone(),
        }
    }
}

/// Takes snapshots from an [`AggregatingRecorder`], also after the recorder
/// itself was installed globally.
#[derive(Clone)]
pub struct SnapshotHandle {
    registry: Arc<Registry>,
}

impl SnapshotHandle {
    pub fn snapshot(&self) -> FlushSnapshot {
        self.registry.snapshot()
    }
}

/// A [`metrics`] recorder that aggregates in-process the way a statsd daemon
/// does, producing one [`FlushSnapshot`] per flush.
///
/// Histograms become timers. Labels are folded into the name as
/// `name.key_value`.
#[derive(Default)]
pub struct AggregatingRecorder {
    registry: Arc<Registry>,
}

impl AggregatingRecorder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle {
            registry: self.registry.clone(),
        }
    }

    /// Install this recorder as the global recorder.
    pub fn install(self) -> Result<SnapshotHandle, SetRecorderError<Self>> {
        let handle = self.handle();
        metrics::set_global_recorder(self)?;
        Ok(handle)
    }

    fn register(&self, key: &Key) -> Arc<Handle> {
        Arc::new(Handle::new(flatten(key), self.registry.clone()))
    }
}

impl Recorder for AggregatingRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describe counter");
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describe gauge");
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describe histogram");
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.register(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.register(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.register(key))
    }
}

fn flatten(key: &Key) -> String {
    let mut name = key.name().to_owned();
    for label in key.labels() {
        name.push('.');
        name.push_str(label.key());
        name.push('_');
        name.push_str(label.value());
    }
    name
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

struct Handle {
    name: String,
    registry: Arc<Registry>,
}

impl Handle {
    fn new(name: String, registry: Arc<Registry>) -> Handle {
        Handle { name, registry }
    }
}

impl CounterFn for Handle {
    fn increment(&self, value: u64) {
        *self.registry.lock().counters.entry(self.name.clone()).or_default() += value as f64;
    }

    /// Replaces the delta collected so far in this interval.
    fn absolute(&self, value: u64) {
        self.registry.lock().counters.insert(self.name.clone(), value as f64);
    }
}

impl GaugeFn for Handle {
    fn increment(&self, value: f64) {
        *self.registry.lock().gauges.entry(self.name.clone()).or_default() += value;
    }

    fn decrement(&self, value: f64) {
        *self.registry.lock().gauges.entry(self.name.clone()).or_default() -= value;
    }

    fn set(&self, value: f64) {
        self.registry.lock().gauges.insert(self.name.clone(), value);
    }
}

impl HistogramFn for Handle {
    fn record(&self, value: f64) {
        self.registry
            .lock()
            .timers
            .entry(self.name.clone())
            .or_default()
            .push(value);
    }
}
