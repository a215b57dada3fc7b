//! Ordered wait-queue over `(timestamp, process)` request keys.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::traits::{ProcessId, ProtocolViolation};

/// One outstanding desire to enter the critical section.
///
/// The derived ordering is the system-wide total order on requests: earlier
/// timestamp first, smaller process id on ties.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RequestKey {
    pub timestamp: Timestamp,
    pub process: ProcessId,
}

/// Pending requests ordered by [`RequestKey`] and indexed by process id.
///
/// At most one entry per process may exist at any instant: a process never
/// re-requests before its previous release. Releases from different senders
/// can be observed out of queue order (per-channel FIFO only orders messages
/// between the same pair), so [`remove`](Self::remove) takes a process id and
/// finds the entry wherever it sits, in `O(log n)`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct RequestQueue {
    ordered: BTreeSet<RequestKey>,
    by_process: BTreeMap<ProcessId, Timestamp>,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// The smallest outstanding request, if any.
    #[must_use]
    pub fn head(&self) -> Option<RequestKey> {
        self.ordered.first().copied()
    }

    #[must_use]
    pub fn contains(&self, process: ProcessId) -> bool {
        self.by_process.contains_key(&process)
    }

    /// Queue a request.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::DuplicateRequest`] if `key.process` already has
    /// an entry, meaning a process issued two overlapping requests.
    pub fn insert(&mut self, key: RequestKey) -> Result<(), ProtocolViolation> {
        if let Some(&queued_at) = self.by_process.get(&key.process) {
            return Err(ProtocolViolation::DuplicateRequest {
                process: key.process,
                queued_at,
            });
        }
        self.by_process.insert(key.process, key.timestamp);
        self.ordered.insert(key);
        Ok(())
    }

    /// Remove the entry for `process`, wherever it sits in the order.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::MissingRequest`] if no entry exists — a release
    /// arrived without a matching recorded request.
    pub fn remove(&mut self, process: ProcessId) -> Result<RequestKey, ProtocolViolation> {
        let Some(timestamp) = self.by_process.remove(&process) else {
            return Err(ProtocolViolation::MissingRequest { process });
        };
        let key = RequestKey { timestamp, process };
        self.ordered.remove(&key);
        Ok(key)
    }

    /// Remove and return the smallest outstanding request.
    pub fn pop_head(&mut self) -> Option<RequestKey> {
        let key = self.ordered.pop_first()?;
        self.by_process.remove(&key.process);
        Some(key)
    }

    /// Outstanding requests in key order.
    pub fn iter(&self) -> impl Iterator<Item = RequestKey> + '_ {
        self.ordered.iter().copied()
    }
}
