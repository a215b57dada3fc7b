//! Lamport logical clock.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A logical timestamp.
///
/// Strictly a process-local ordering aid; the system-wide total order is
/// `(timestamp, process id)` lexicographic. See [`RequestKey`].
///
/// [`RequestKey`]: crate::queue::RequestKey
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monotonically advancing counter updated by Lamport's rule.
///
/// Only message receipt advances the clock: timestamps exist to compare
/// events across processes, and receipt is the only point where two
/// processes' histories meet. Local events read the clock without ticking it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct LamportClock {
    now: Timestamp,
}

impl LamportClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Timestamp::ZERO,
        }
    }

    /// Current value, without advancing.
    #[must_use]
    pub const fn now(&self) -> Timestamp {
        self.now
    }

    /// Merge a timestamp observed on an incoming message:
    /// `now = max(now, observed) + 1`. Returns the new value.
    pub fn witness(&mut self, observed: Timestamp) -> Timestamp {
        self.now = Timestamp(self.now.0.max(observed.0) + 1);
        self.now
    }
}
