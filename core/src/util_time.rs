use chrono::prelude::*;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds since the unix epoch, the unit of `measure_time` and of the
/// backend's introspection timestamps.
pub fn epoch_seconds() -> i64 {
    now().timestamp()
}
