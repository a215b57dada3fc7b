//! Distributed mutual exclusion library
//!
//! This library provides four algorithms that guarantee at most one of `N`
//! cooperating processes is inside a critical section at a time, using only
//! point-to-point message passing:
//!
//! - [`Centralized`]: one coordinator process arbitrates all entry
//! - [`Lamport`]: permission-based, every process mirrors the global wait queue
//! - [`RicartAgrawala`]: permission-based with deferred replies, no queue broadcast
//! - [`TokenRing`]: a single token circulates a fixed logical ring
//!
//! # Architecture
//!
//! Each algorithm is a pure state machine implementing [`Participant`]. The
//! surrounding runtime implements [`Environment`] and drives the state machine
//! by delivering one event at a time: a message from a peer, a local request
//! to enter the critical section, or a local request to leave it. The state
//! machine reacts by calling back into the environment (`lock`, `unlock`,
//! `send`) and returns; waiting is represented by not yet calling `lock()`.
//!
//! Delivery must be FIFO per ordered pair of processes, lossless and
//! duplication-free; delays may be arbitrary but finite. Process ids are
//! fixed integers in `1..=N`.
//!
//! # Quick Start
//!
//! ```ignore
//! use basic_mutex::{Lamport, Participant};
//!
//! let mut process = Lamport::new();
//! // Environment plumbing elsewhere:
//! process.on_lock_request(&mut env)?;          // want the critical section
//! process.on_message(&mut env, source, msg)?;  // react to a delivered message
//! process.on_unlock_request(&mut env)?;        // leave the critical section
//! ```

#![warn(clippy::pedantic)]

mod centralized;
mod clock;
mod events;
mod lamport;
mod messages;
mod queue;
mod ricart_agrawala;
mod token_ring;
mod traits;

#[cfg(test)]
mod testenv;

pub use centralized::{COORDINATOR, Centralized};
pub use clock::{LamportClock, Timestamp};
pub use events::{EventLog, EventRecord, ProcessEvent};
pub use lamport::Lamport;
pub use messages::Message;
pub use queue::{RequestKey, RequestQueue};
pub use ricart_agrawala::RicartAgrawala;
pub use token_ring::{INITIATOR, TokenRing};
pub use traits::{Environment, Participant, ProcessId, ProtocolViolation};
