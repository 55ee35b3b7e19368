//! Append-only, deduplicated record of the steps executed in one run.

use std::collections::HashSet;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::record::{StepKey, StepObservation, StepRecord};

/// Consumer notified of every record the ledger accepts.
///
/// `history` is the full ledger in order and ends with `record`.
pub trait LedgerObserver {
    fn on_append(&mut self, record: &StepRecord, history: &[StepRecord]);
}

/// Ordered collection of stamped step records for one run.
///
/// No two records share a `(scenario, step, url)` triple: a repeated triple
/// is dropped on arrival.
pub struct Ledger {
    records: Vec<StepRecord>,
    keys: HashSet<StepKey>,
    clock: Box<dyn Clock>,
}

impl Ledger {
    /// Create an empty ledger stamping records with the wall clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty ledger with a specific time source
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            records: Vec::new(),
            keys: HashSet::new(),
            clock: Box::new(clock),
        }
    }

    /// Append an observation; returns `false` when its triple is already present
    pub fn append(&mut self, observation: StepObservation) -> bool {
        self.append_with(observation, &mut [])
    }

    /// Append an observation and push the accepted record to `observers`
    pub fn append_with(
        &mut self,
        observation: StepObservation,
        observers: &mut [&mut dyn LedgerObserver],
    ) -> bool {
        let key = observation.key();
        if self.keys.contains(&key) {
            debug!(
                scenario = %key.scenario_name,
                step = %key.step_name,
                "duplicate step report dropped"
            );
            return false;
        }

        let record = StepRecord::stamp(observation, self.next_timestamp());
        self.keys.insert(key);
        self.records.push(record);

        if let Some(record) = self.records.last() {
            for observer in observers.iter_mut() {
                observer.on_append(record, &self.records);
            }
        }
        true
    }

    /// Snapshot copy of all records in ledger order
    pub fn all(&self) -> Vec<StepRecord> {
        self.records.clone()
    }

    /// Read-only view of the records in ledger order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    /// Clear every record; only meant for run boundaries
    pub fn reset(&mut self) {
        self.records.clear();
        self.keys.clear();
    }

    /// Clock reading clamped so timestamps never go backwards in ledger order
    fn next_timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        let now = self.clock.now();
        match self.records.last() {
            Some(last) if last.execution_time > now => last.execution_time,
            _ => now,
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::record::StepStatus;
    use chrono::{Duration, TimeZone, Utc};

    struct Counter {
        seen: Vec<String>,
        history_lens: Vec<usize>,
    }

    impl LedgerObserver for Counter {
        fn on_append(&mut self, record: &StepRecord, history: &[StepRecord]) {
            self.seen.push(record.step_name.clone());
            self.history_lens.push(history.len());
        }
    }

    #[test]
    fn test_duplicate_triple_is_dropped() {
        let mut ledger = Ledger::new();
        assert!(ledger.append(StepObservation::new("S", "Open home").url("https://x")));
        assert!(!ledger.append(
            StepObservation::new("S", "Open home")
                .url("https://x")
                .status(StepStatus::Failed)
        ));
        assert_eq!(ledger.len(), 1);
        // the first report wins
        assert_eq!(ledger.all()[0].status, StepStatus::Started);
    }

    #[test]
    fn test_same_step_different_url_is_kept() {
        let mut ledger = Ledger::new();
        assert!(ledger.append(StepObservation::new("S", "Open home").url("https://a")));
        assert!(ledger.append(StepObservation::new("S", "Open home").url("https://b")));
        assert!(ledger.append(StepObservation::new("S", "Open home")));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        // a clock running backwards must not reorder ledger time
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let mut ledger = Ledger::with_clock(ManualClock::new(start, Duration::seconds(-5)));
        for i in 0..4 {
            ledger.append(StepObservation::new("S", format!("step {}", i)));
        }
        let records = ledger.all();
        for pair in records.windows(2) {
            assert!(pair[0].execution_time <= pair[1].execution_time);
        }
    }

    #[test]
    fn test_observers_see_accepted_records_only() {
        let mut ledger = Ledger::with_clock(ManualClock::ticking_seconds());
        let mut counter = Counter { seen: vec![], history_lens: vec![] };

        ledger.append_with(StepObservation::new("S", "a"), &mut [&mut counter]);
        ledger.append_with(StepObservation::new("S", "a"), &mut [&mut counter]);
        ledger.append_with(StepObservation::new("S", "b"), &mut [&mut counter]);

        assert_eq!(counter.seen, vec!["a", "b"]);
        assert_eq!(counter.history_lens, vec![1, 2]);
    }

    #[test]
    fn test_reset_allows_same_triple_again() {
        let mut ledger = Ledger::new();
        ledger.append(StepObservation::new("S", "a"));
        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.append(StepObservation::new("S", "a")));
    }
}
