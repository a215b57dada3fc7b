//! Token ring algorithm.
//!
//! A single token circulates the fixed ring `1 → 2 → … → N → 1`. Receiving
//! it grants entry: a process that wants the critical section keeps the token
//! while inside and passes it on when leaving; everyone else forwards it
//! immediately. No clocks and no per-entry handshake, but the token keeps
//! moving even when nobody wants in.

use tracing::{debug, trace};

use crate::messages::Message;
use crate::traits::{Environment, Participant, ProcessId, ProtocolViolation};

/// The process that puts the token into circulation at startup.
pub const INITIATOR: ProcessId = ProcessId::new(1);

fn successor(env: &dyn Environment) -> ProcessId {
    ProcessId::new(env.process_id().get() % env.process_count() + 1)
}

/// Token-ring mutual exclusion.
///
/// The token is never stored: between handlers it is either an in-flight
/// message or implicitly held by the one process inside the critical section.
/// Exactly one of the two at any instant.
#[derive(Clone, Debug)]
pub struct TokenRing {
    wants: bool,
}

impl TokenRing {
    /// Creates the process's ring state. On [`INITIATOR`] this sends the
    /// token on its first hop; everyone else starts idle.
    #[must_use]
    pub fn new(env: &mut dyn Environment) -> Self {
        if env.process_id() == INITIATOR {
            debug!(to = ?successor(env), "launching token");
            env.send(successor(env), Message::Token);
        }
        Self { wants: false }
    }
}

impl Participant for TokenRing {
    fn on_message(
        &mut self,
        env: &mut dyn Environment,
        source: ProcessId,
        message: Message,
    ) -> Result<(), ProtocolViolation> {
        match message {
            Message::Token => {
                if self.wants {
                    debug!("token arrived, entering");
                    env.lock();
                } else {
                    trace!(to = ?successor(env), "forwarding token");
                    env.send(successor(env), Message::Token);
                }
            }
            Message::Request { .. } | Message::Grant { .. } | Message::Release { .. } => {
                trace!(?source, ?message, "ignoring foreign kind");
            }
        }
        Ok(())
    }

    fn on_lock_request(&mut self, _env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        trace!("waiting for token");
        self.wants = true;
        Ok(())
    }

    fn on_unlock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        env.unlock();
        self.wants = false;
        trace!(to = ?successor(env), "passing token on");
        env.send(successor(env), Message::Token);
        Ok(())
    }
}
