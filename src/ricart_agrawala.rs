//! Ricart–Agrawala's algorithm.
//!
//! An optimization of Lamport's scheme: the grant doubles as the release. A
//! process answers a peer's request immediately unless its own outstanding
//! request has priority, in which case the reply is withheld until its own
//! exit. Entry needs all `N` permissions and nothing else, so there is no
//! mirrored queue to keep converged. 2(N-1) messages per entry.

use tracing::{debug, trace};

use crate::clock::{LamportClock, Timestamp};
use crate::events::{EventLog, ProcessEvent};
use crate::messages::Message;
use crate::queue::{RequestKey, RequestQueue};
use crate::traits::{Environment, Participant, ProcessId, ProtocolViolation};

fn broadcast(env: &mut dyn Environment, message: Message) {
    let own = env.process_id();
    for id in 1..=env.process_count() {
        let destination = ProcessId::new(id);
        if destination != own {
            env.send(destination, message);
        }
    }
}

/// Ricart–Agrawala mutual exclusion.
#[derive(Clone, Debug, Default)]
pub struct RicartAgrawala {
    clock: LamportClock,
    /// Permissions collected for the own outstanding request, self included.
    grants: u32,
    /// Timestamp of the own outstanding request. `None` while not requesting,
    /// which compares after every peer request.
    pending: Option<Timestamp>,
    /// Requests answered only on exit, in key order.
    deferred: RequestQueue,
    events: EventLog,
}

impl RicartAgrawala {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical clock value.
    #[must_use]
    pub fn clock(&self) -> Timestamp {
        self.clock.now()
    }

    /// Timestamp of the own outstanding request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<Timestamp> {
        self.pending
    }

    /// Peer requests awaiting this process's exit.
    #[must_use]
    pub fn deferred(&self) -> &RequestQueue {
        &self.deferred
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn try_enter(&mut self, env: &mut dyn Environment) {
        if self.grants == env.process_count() {
            debug!(clock = ?self.clock.now(), "entering");
            self.events.record(self.clock.now(), ProcessEvent::Entered);
            env.lock();
        }
    }
}

impl Participant for RicartAgrawala {
    fn on_message(
        &mut self,
        env: &mut dyn Environment,
        source: ProcessId,
        message: Message,
    ) -> Result<(), ProtocolViolation> {
        match message {
            Message::Request {
                timestamp,
                requested_at,
            } => {
                let now = self.clock.witness(timestamp);
                self.events.record(now, ProcessEvent::Delivered { from: source });
                let theirs = RequestKey {
                    timestamp: requested_at,
                    process: source,
                };
                let precedes_own = self.pending.is_none_or(|at| {
                    theirs
                        < RequestKey {
                            timestamp: at,
                            process: env.process_id(),
                        }
                });
                if precedes_own {
                    trace!(?source, ?requested_at, "granting");
                    env.send(source, Message::Grant { timestamp: now });
                } else {
                    trace!(?source, ?requested_at, "deferring");
                    self.deferred.insert(theirs)?;
                }
            }
            Message::Grant { timestamp } => {
                let now = self.clock.witness(timestamp);
                self.events.record(now, ProcessEvent::Delivered { from: source });
                self.grants += 1;
                trace!(?source, grants = self.grants, "granted");
                self.try_enter(env);
            }
            Message::Release { timestamp } => {
                // Valid wire kind this algorithm never consumes
                let now = self.clock.witness(timestamp);
                self.events.record(now, ProcessEvent::Delivered { from: source });
                trace!(?source, "ignoring release");
            }
            Message::Token => {
                return Err(ProtocolViolation::UnexpectedMessage { sender: source, message });
            }
        }
        Ok(())
    }

    fn on_lock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        if let Some(queued_at) = self.pending {
            return Err(ProtocolViolation::DuplicateRequest {
                process: env.process_id(),
                queued_at,
            });
        }
        let requested_at = self.clock.now();
        self.pending = Some(requested_at);
        self.grants = 1;
        self.events.record(requested_at, ProcessEvent::Requested);
        debug!(?requested_at, "requesting");
        broadcast(
            env,
            Message::Request {
                timestamp: self.clock.now(),
                requested_at,
            },
        );
        self.try_enter(env);
        Ok(())
    }

    fn on_unlock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        env.unlock();
        self.events.record(self.clock.now(), ProcessEvent::Exited);
        self.pending = None;
        debug!(deferred = self.deferred.len(), "releasing");
        while let Some(key) = self.deferred.pop_head() {
            env.send(
                key.process,
                Message::Grant {
                    timestamp: self.clock.now(),
                },
            );
        }
        Ok(())
    }
}
