/*!

# metrics-backend-librato

A statsd-style flush backend for the [Librato](https://www.librato.com/docs/api/) metrics API.

On every flush the backend turns the counters, timers and gauges a host aggregated during the interval into one JSON
payload and posts it to the API:

- Counters are published as running totals. A counter that is not reported in a flush is forgotten and starts from
  zero when it shows up again. With `legacyCounters` the raw per-interval delta is published instead.
- Timers are reduced to count, sum, sum of squares, min and max. Percentiles are left to the receiving side.
- A failed delivery is retried once after a fixed delay if the server answered with a 5xx or could not be reached.
  Requests rejected with a 4xx are dropped. Nothing is queued beyond that single retry.

The backend can be driven by any host through the [`Backend`] trait, or from the [`metrics`] facade with an
[`AggregatingRecorder`] and a [`FlushLoop`].

Example:

```rust,no_run
use metrics_backend_librato::{AggregatingRecorder, Backend, FlushLoop, HostConfig, LibratoBackend};

# #[tokio::main(flavor = "current_thread")]
# async fn main() {
let config = HostConfig::from_json(r#"{
    "flushInterval": 10000,
    "librato": { "email": "ops@example.com", "token": "secret", "source": "web-1" }
}"#)
.expect("invalid config");

let backend = LibratoBackend::init(0, &config).expect("librato is not configured");
let recorder = AggregatingRecorder::new();

// Flush every `flushInterval` until the guard is dropped.
let guard = FlushLoop::from_config(&config).start_with(backend, &recorder);
recorder.install().expect("failed to set global recorder");

metrics::counter!("requests").increment(1);
# drop(guard);
# }
```

*/

mod backend;
mod config;
mod delivery;
mod flush_loop;
mod http_transport;
mod recorder;

pub use backend::{
    Backend,
    LibratoBackend,
};
pub use config::{
    ConfigError,
    DeliveryConfig,
    Endpoint,
    HostConfig,
    LibratoConfig,
    Scheme,
    DEFAULT_ENDPOINT,
};
pub use delivery::{
    Delivery,
    DeliveryClient,
};
pub use flush_loop::FlushLoop;
pub use http_transport::{
    DeliveryError,
    HttpPostTransport,
    Transport,
    USER_AGENT,
};
pub use metrics_backend_librato_core::{
    sanitize,
    util_time,
    CounterLedger,
    CounterRecord,
    FlushSnapshot,
    GaugeRecord,
    LedgerEntry,
    OutgoingPayload,
    MAX_NAME_LEN,
    NUM_STATS,
};
pub use recorder::{
    AggregatingRecorder,
    SnapshotHandle,
};

#[macro_use]
extern crate tracing;

#[macro_use]
extern crate scopeguard;
