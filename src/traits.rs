//! Core seams: process identity, the environment capability, the participant
//! contract, and the fatal protocol error.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::messages::Message;

/// Identity of a process, fixed for its lifetime.
///
/// The runtime assigns ids `1..=N` where `N` is the process count; every
/// process knows both. Ordering breaks logical-timestamp ties, smaller id
/// first.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessId(u32);

impl ProcessId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability the surrounding runtime offers to an algorithm.
///
/// `lock`/`unlock` are synchronous signals marking the boundaries of the
/// critical section; they must not block. `send` enqueues for asynchronous
/// delivery that is lossless, duplication-free, and FIFO per ordered pair
/// of processes.
pub trait Environment {
    /// This process's fixed id in `1..=N`.
    fn process_id(&self) -> ProcessId;

    /// Total number of processes, fixed for the run.
    fn process_count(&self) -> u32;

    /// Signals actual entry into the critical section. Called only when the
    /// algorithm's entry condition holds.
    fn lock(&mut self);

    /// Signals actual exit. Called only while inside the critical section.
    fn unlock(&mut self);

    /// Enqueues `message` for delivery to `destination`.
    fn send(&mut self, destination: ProcessId, message: Message);
}

/// The three-event contract every algorithm implements.
///
/// The environment invokes these strictly one at a time per process, so
/// implementations need no internal locking. A handler mutates its own state,
/// calls back into the environment zero or more times, and returns. An `Err`
/// means the event sequence violated a protocol invariant; the process must
/// not be driven further.
pub trait Participant {
    /// React to a message from `source`, delivered in FIFO order per source.
    fn on_message(
        &mut self,
        env: &mut dyn Environment,
        source: ProcessId,
        message: Message,
    ) -> Result<(), ProtocolViolation>;

    /// React to the local decision to enter the critical section. Not
    /// re-invoked before the matching unlock completes.
    fn on_lock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation>;

    /// React to the local decision to leave. Invoked only while holding.
    fn on_unlock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation>;
}

/// Fatal internal-consistency failure.
///
/// Harnesses may feed deliberately malformed event sequences; the algorithms
/// detect them and fail loudly instead of corrupting state. A process that
/// returned an error has stopped participating in the protocol.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ProtocolViolation {
    /// A request was queued for a process that already has one outstanding.
    #[error("process {process} already has a request queued at {queued_at}")]
    DuplicateRequest {
        process: ProcessId,
        /// Timestamp of the request already held.
        queued_at: Timestamp,
    },

    /// A release arrived from a process with no queued request to remove.
    #[error("release from process {process} matches no queued request")]
    MissingRequest { process: ProcessId },

    /// A message kind this algorithm can never witness.
    ///
    /// The field is named `sender`, not `source`: thiserror reserves a
    /// `source` field for error chaining, and a [`ProcessId`] is not an
    /// error.
    #[error("process {sender} sent {message:?}, which this algorithm cannot handle")]
    UnexpectedMessage { sender: ProcessId, message: Message },
}
