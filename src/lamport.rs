//! Lamport's permission-based algorithm.
//!
//! Every process mirrors the same logical wait queue. A request is broadcast
//! with the requester's timestamp; each peer queues it and answers with a
//! grant unconditionally; the requester enters once its own entry heads its
//! queue and all `N` permissions (its own included) are in. A release is
//! broadcast and removes the releaser's entry from every mirror. 3(N-1)
//! messages per entry.

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

/// Lamport mutual exclusion.
///
/// `requests` holds this process's view of every outstanding request in the
/// system, its own included. The view converges: all processes agree on the
/// head whenever entry is decided.
#[derive(Clone, Debug, Default)]
pub struct Lamport {
    clock: LamportClock,
    /// Permissions collected for the own outstanding request, self included.
    grants: u32,
    requests: RequestQueue,
    events: EventLog,
}

impl Lamport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical clock value.
    #[must_use]
    pub fn clock(&self) -> Timestamp {
        self.clock.now()
    }

    /// This process's view of the outstanding requests.
    #[must_use]
    pub fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Enter if the own entry heads the queue and every process has granted.
    /// Head position alone is not enough: the grants prove every peer has
    /// witnessed the request, so no earlier request can still be in flight.
    fn try_enter(&mut self, env: &mut dyn Environment) {
        let at_head = self
            .requests
            .head()
            .is_some_and(|head| head.process == env.process_id());
        if at_head && self.grants == env.process_count() {
            debug!(clock = ?self.clock.now(), "entering");
            self.events.record(self.clock.now(), ProcessEvent::Entered);
            env.lock();
        }
    }
}

impl Participant for Lamport {
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
                self.requests.insert(RequestKey {
                    timestamp: requested_at,
                    process: source,
                })?;
                trace!(?source, ?requested_at, "queued, granting");
                env.send(source, Message::Grant { timestamp: now });
            }
            Message::Grant { timestamp } => {
                let now = self.clock.witness(timestamp);
                self.events.record(now, ProcessEvent::Delivered { from: source });
                self.grants += 1;
                trace!(?source, grants = self.grants, "granted");
                self.try_enter(env);
            }
            Message::Release { timestamp } => {
                let now = self.clock.witness(timestamp);
                self.events.record(now, ProcessEvent::Delivered { from: source });
                let removed = self.requests.remove(source)?;
                trace!(?removed, "released");
                self.try_enter(env);
            }
            Message::Token => {
                return Err(ProtocolViolation::UnexpectedMessage { sender: source, message });
            }
        }
        Ok(())
    }

    fn on_lock_request(&mut self, env: &mut dyn Environment) -> Result<(), ProtocolViolation> {
        let requested_at = self.clock.now();
        self.requests.insert(RequestKey {
            timestamp: requested_at,
            process: env.process_id(),
        })?;
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
        self.requests.remove(env.process_id())?;
        debug!(clock = ?self.clock.now(), "releasing");
        broadcast(
            env,
            Message::Release {
                timestamp: self.clock.now(),
            },
        );
        Ok(())
    }
}
