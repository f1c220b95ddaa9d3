use bytes::Bytes;
use serde::Serialize;

pub type Error = serde_json::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// An entry of the payload's `gauges` array.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum GaugeRecord {
    /// A gauge reported as-is.
    Plain { name: String, value: f64 },
    /// Raw moments of one cycle's timer samples. The receiving side derives
    /// mean and deviation from them.
    Summary {
        name: String,
        count: u64,
        sum: f64,
        sum_squares: f64,
        min: f64,
        max: f64,
    },
}

impl GaugeRecord {
    pub fn name(&self) -> &str {
        match self {
            GaugeRecord::Plain { name, .. } | GaugeRecord::Summary { name, .. } => name,
        }
    }
}

/// An entry of the payload's `counters` array.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CounterRecord {
    pub name: String,
    pub value: f64,
}

/// The body of one `POST /v1/metrics` request.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutgoingPayload {
    pub gauges: Vec<GaugeRecord>,
    pub counters: Vec<CounterRecord>,
    pub measure_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl OutgoingPayload {
    pub fn encode(
        measure_time: i64,
        gauges: Vec<GaugeRecord>,
        counters: Vec<CounterRecord>,
        source: Option<String>,
    ) -> Self {
        Self {
            gauges,
            counters,
            measure_time,
            source,
        }
    }

    /// Serialize to JSON. The buffer length is what goes into `Content-Length`.
    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
