//! Transport-independent model of the Librato flush backend: name sanitizing,
//! the cross-cycle counter ledger, timer reduction and the JSON payload.

#[macro_use]
extern crate tracing;

mod ledger;
mod name;
mod payload;
mod snapshot;
mod timer;
pub mod util_time;

pub use ledger::{
    CounterLedger,
    LedgerEntry,
    NUM_STATS,
};
pub use name::{
    sanitize,
    MAX_NAME_LEN,
};
pub use payload::{
    CounterRecord,
    Error,
    GaugeRecord,
    OutgoingPayload,
    Result,
};
pub use snapshot::FlushSnapshot;
pub use timer::reduce;
