//! Centralized coordinator algorithm.
//!
//! One designated process arbitrates all entry. Everyone else asks it for
//! permission and tells it when they are done; the coordinator keeps a FIFO
//! queue of waiters. 2 messages per entry for remote processes (3 counting
//! the release), 0 for the coordinator itself, but the coordinator is a
//! single point of failure and a throughput bottleneck.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::clock::Timestamp;
use crate::messages::Message;
use crate::traits::{Environment, Participant, ProcessId, ProtocolViolation};

/// The process that arbitrates entry.
pub const COORDINATOR: ProcessId = ProcessId::new(1);

/// Coordinator-arbitrated mutual exclusion.
///
/// The queue and the `free` flag are only ever touched on the process whose
/// id is [`COORDINATOR`]; on every other process they stay at their initial
/// values. This algorithm does not use logical clocks, so its messages carry
/// [`Timestamp::ZERO`].
#[derive(Clone, Debug)]
pub struct Centralized {
    /// Whether the critical section is currently unheld. Coordinator only.
    free: bool,
    /// Waiters in arrival order. Coordinator only.
    queue: VecDeque<ProcessId>,
}

/// Same as [`Centralized::new`]: the section starts unheld.
impl Default for Centralized {
    fn default() -> Self {
        Self::new()
    }
}

impl Centralized {
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: true,
            queue: VecDeque::new(),
        }
    }

    /// Hand the critical section to `process`. The coordinator admitting
    /// itself is a local `lock()`, never a self-addressed message.
    fn admit(&mut self, env: &mut dyn Environment, process: ProcessId) {
        self.free = false;
        debug!(?process, "admitting");
        if process == env.process_id() {
            env.lock();
        } else {
            env.send(
                process,
                Message::Grant {
                    timestamp: Timestamp::ZERO,
                },
            );
        }
    }

    /// The critical section was released: admit the next waiter or mark the
    /// section free.
    fn release(&mut self, env: &mut dyn Environment) {
        if let Some(next) = self.queue.pop_front() {
            self.admit(env, next);
        } else {
            debug!("section free");
            self.free = true;
        }
    }
}

impl Participant for Centralized {
    fn on_message(
        &mut self,
        env: &mut dyn Environment,
        source: ProcessId,
        message: Message,
    ) -> Result<(), ProtocolViolation> {
        if env.process_id() == COORDINATOR {
            match message {
                Message::Request { .. } => {
                    if self.free {
                        self.admit(env, source);
                    } else {
                        trace!(?source, waiting = self.queue.len(), "queueing");
                        self.queue.push_back(source);
                    }
                }
                Message::Release { .. } => self.release(env),
                Message::Grant { .. } | Message::Token => {
                    trace!(?source, ?message, "ignoring foreign kind");
                }
            }
        } else {
            match message {
                Message::Grant { .. } => {
                    debug!("granted, entering");
                    env.lock();
                }
                Message::Request { .. } | Message::Release { .. } | Message::Token => {
                    trace!(?source, ?message, "ignoring foreign kind");
                }
            }
        }
        Ok(())
    }

    fn on_lock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        if env.process_id() == COORDINATOR {
            if self.free {
                let own = env.process_id();
                self.admit(env, own);
            } else {
                trace!(waiting = self.queue.len(), "queueing self");
                self.queue.push_back(env.process_id());
            }
        } else {
            trace!("asking coordinator");
            env.send(
                COORDINATOR,
                Message::Request {
                    timestamp: Timestamp::ZERO,
                    requested_at: Timestamp::ZERO,
                },
            );
        }
        Ok(())
    }

    fn on_unlock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        env.unlock();
        if env.process_id() == COORDINATOR {
            self.release(env);
        } else {
            env.send(
                COORDINATOR,
                Message::Release {
                    timestamp: Timestamp::ZERO,
                },
            );
        }
        Ok(())
    }
}
