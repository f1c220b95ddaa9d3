use crate::{
    sanitize,
    CounterRecord,
};
use std::collections::HashMap;

/// Name of the synthetic counter reporting how many records a flush carried.
pub const NUM_STATS: &str = "numStats";

/// Running total of one counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub accumulated: f64,
    pub last_update_cycle: u64,
}

/// Turns per-cycle counter deltas into monotonically increasing values.
///
/// A counter only keeps its total while it is reported in every consecutive
/// cycle. A cycle without it removes the entry, and a later report starts from
/// zero again.
///
/// In legacy mode the ledger is bypassed and every delta is published as-is.
#[derive(Debug, Default)]
pub struct CounterLedger {
    entries: HashMap<String, LedgerEntry>,
    legacy: bool,
}

impl CounterLedger {
    pub fn new(legacy: bool) -> Self {
        Self {
            entries: HashMap::new(),
            legacy,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Fold one cycle's deltas into the ledger and return the records to
    /// publish. `cycle` must differ from the previous call's.
    pub fn apply<'a>(&mut self, cycle: u64, deltas: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<CounterRecord> {
        if self.legacy {
            return deltas
                .into_iter()
                .map(|(name, delta)| CounterRecord {
                    name: sanitize(name),
                    value: delta,
                })
                .collect();
        }

        let mut records = Vec::new();
        for (name, delta) in deltas {
            let entry = self.entries.entry(name.to_owned()).or_insert(LedgerEntry {
                accumulated: 0.0,
                last_update_cycle: cycle,
            });
            entry.accumulated += delta;
            entry.last_update_cycle = cycle;
            records.push(CounterRecord {
                name: sanitize(name),
                value: entry.accumulated,
            });
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_update_cycle == cycle);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            trace!(%pruned, %cycle, "pruned counters that were not reported");
        }

        records
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
