//! Protocol messages exchanged by the algorithms.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// A message on the wire. Each variant carries only the fields its kind uses.
///
/// `timestamp` is always the sender's clock sample at send time, witnessed by
/// the receiving clock. The clock-free algorithms (centralized, token ring)
/// send [`Timestamp::ZERO`] and ignore the field on receipt.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Message {
    /// The sender wants the critical section. `requested_at` is the sender's
    /// clock at the moment it decided to enter, and is what peers queue.
    Request {
        timestamp: Timestamp,
        requested_at: Timestamp,
    },
    /// Permission for the recipient to proceed.
    Grant { timestamp: Timestamp },
    /// The sender has left the critical section.
    Release { timestamp: Timestamp },
    /// The circulating token of the ring algorithm. Never stored: a process
    /// either holds the critical section or forwards the token on.
    Token,
}
