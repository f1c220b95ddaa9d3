use std::collections::BTreeMap;

/// Everything the host aggregated during one flush interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushSnapshot {
    /// Counter deltas since the previous flush.
    pub counters: BTreeMap<String, f64>,
    /// Timer samples collected during the interval, in arrival order.
    pub timers: BTreeMap<String, Vec<f64>>,
    /// Current gauge values.
    pub gauges: BTreeMap<String, f64>,
}

impl FlushSnapshot {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn counter(mut self, name: impl Into<String>, delta: f64) -> Self {
        self.counters.insert(name.into(), delta);
        self
    }

    pub fn timer(mut self, name: impl Into<String>, samples: impl IntoIterator<Item = f64>) -> Self {
        self.timers.entry(name.into()).or_default().extend(samples);
        self
    }

    pub fn gauge(mut self, name: impl Into<String>, value: f64) -> Self {
        self.gauges.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.timers.is_empty() && self.gauges.is_empty()
    }
}
