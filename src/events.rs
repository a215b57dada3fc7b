//! Per-process event history, stamped with the local logical clock.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::traits::ProcessId;

/// Something observable that happened at one process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProcessEvent {
    /// A message from `from` was received and processed.
    Delivered { from: ProcessId },
    /// The process asked to enter the critical section.
    Requested,
    /// The process entered the critical section.
    Entered,
    /// The process left the critical section.
    Exited,
}

/// One event and the clock value after it was applied.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventRecord {
    pub clock: Timestamp,
    pub event: ProcessEvent,
}

/// Append-only log of [`EventRecord`]s in local happened-before order.
///
/// Within one log, clock values never decrease, and every
/// [`ProcessEvent::Delivered`] record carries a strictly larger clock than
/// the record before it.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, clock: Timestamp, event: ProcessEvent) {
        self.records.push(EventRecord { clock, event });
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Clock values in log order.
    pub fn clocks(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.records.iter().map(|record| record.clock)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
