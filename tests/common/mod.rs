//! Shared harness for the integration suites: a deterministic, randomized
//! in-memory network that drives any [`Participant`] implementation while
//! monitoring the properties every algorithm must uphold.

use std::collections::{BTreeMap, VecDeque};

use basic_mutex::{Environment, EventLog, Message, Participant, ProcessEvent, ProcessId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Initialize tracing for tests. Call at the start of each test.
/// Uses RUST_LOG env var for filtering (defaults to "debug" for this crate).
pub fn init_tracing() -> impl Sized {
    use tracing::Dispatch;
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("basic_mutex=debug")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer()
        .finish();

    let dispatch = Dispatch::new(subscriber);
    tracing::dispatcher::set_default(&dispatch)
}

#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub processes: u32,
    /// Critical-section entries each process performs before the run is done.
    pub entries_per_process: u32,
    pub seed: u64,
    /// Scheduler steps before the run is declared stuck.
    pub max_steps: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            processes: 3,
            entries_per_process: 2,
            seed: 0,
            max_steps: 100_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Effect {
    Lock,
    Unlock,
    Send { to: ProcessId, message: Message },
}

/// Buffers a handler's environment calls so the world can apply them with
/// its invariant checks after the handler returns.
struct EnvProxy {
    id: ProcessId,
    count: u32,
    effects: Vec<Effect>,
}

impl EnvProxy {
    fn new(id: ProcessId, count: u32) -> Self {
        Self {
            id,
            count,
            effects: Vec::new(),
        }
    }
}

impl Environment for EnvProxy {
    fn process_id(&self) -> ProcessId {
        self.id
    }

    fn process_count(&self) -> u32 {
        self.count
    }

    fn lock(&mut self) {
        self.effects.push(Effect::Lock);
    }

    fn unlock(&mut self) {
        self.effects.push(Effect::Unlock);
    }

    fn send(&mut self, destination: ProcessId, message: Message) {
        self.effects.push(Effect::Send {
            to: destination,
            message,
        });
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Idle,
    Waiting,
    Holding,
}

#[derive(Clone, Copy, Debug)]
enum Move {
    Deliver { from: ProcessId, to: ProcessId },
    Request(usize),
    Unlock(usize),
}

/// An in-memory world of `N` processes with per-pair FIFO channels and a
/// seeded random scheduler.
///
/// Each step the scheduler picks uniformly among the enabled events: deliver
/// the head of a non-empty channel, have an idle process with entries left
/// request the critical section, or have the current holder leave. Every
/// `lock`/`unlock` effect is checked against the mutual-exclusion and
/// holder-matching invariants as it is applied.
pub struct SimWorld<P> {
    config: SimConfig,
    rng: StdRng,
    participants: Vec<P>,
    phases: Vec<Phase>,
    /// Entries each process still has to perform.
    remaining: Vec<u32>,
    /// Entries each process has completed.
    completed: Vec<u32>,
    channels: BTreeMap<(ProcessId, ProcessId), VecDeque<Message>>,
    holder: Option<ProcessId>,
    self_sends: usize,
    tokens_min: usize,
    tokens_max: usize,
}

impl<P: Participant> SimWorld<P> {
    /// Builds the world, constructing one participant per process through
    /// `make`. Constructor-time sends (the token launch) go through the same
    /// checked channels as everything else.
    pub fn new<F>(config: SimConfig, mut make: F) -> Self
    where
        F: FnMut(&mut dyn Environment) -> P,
    {
        let n = config.processes as usize;
        let mut world = Self {
            config,
            rng: StdRng::seed_from_u64(config.seed),
            participants: Vec::with_capacity(n),
            phases: vec![Phase::Idle; n],
            remaining: vec![config.entries_per_process; n],
            completed: vec![0; n],
            channels: BTreeMap::new(),
            holder: None,
            self_sends: 0,
            tokens_min: usize::MAX,
            tokens_max: 0,
        };
        for id in 1..=config.processes {
            let mut proxy = EnvProxy::new(ProcessId::new(id), config.processes);
            let participant = make(&mut proxy);
            world.participants.push(participant);
            world.apply(ProcessId::new(id), proxy.effects);
        }
        world.observe_tokens();
        world
    }

    pub fn participants(&self) -> &[P] {
        &self.participants
    }

    /// Completed entries per process, indexed by `id - 1`.
    pub fn completed(&self) -> &[u32] {
        &self.completed
    }

    pub fn self_sends(&self) -> usize {
        self.self_sends
    }

    /// Extremes of `tokens in flight + critical sections held`, sampled after
    /// every step. For the ring this must stay pinned at exactly one.
    pub fn token_extremes(&self) -> (usize, usize) {
        (self.tokens_min, self.tokens_max)
    }

    fn complete(&self) -> bool {
        self.remaining.iter().all(|&r| r == 0) && self.phases.iter().all(|&p| p == Phase::Idle)
    }

    /// Runs the random schedule until every process has performed its
    /// entries. Panics if the step budget runs out or no event is enabled,
    /// both of which mean lost liveness.
    pub fn run(&mut self) {
        let mut steps = 0u64;
        while !self.complete() {
            assert!(
                steps < self.config.max_steps,
                "workload incomplete after {} steps: completed {:?}",
                self.config.max_steps,
                self.completed,
            );
            self.step();
            steps += 1;
        }
    }

    /// Delivers everything still in flight, deterministically. Terminates for
    /// the handshake algorithms, whose channels drain once nobody requests;
    /// never call it on a ring world, where the token circulates forever.
    pub fn drain(&mut self) {
        let mut budget = self.config.max_steps;
        loop {
            let Some(channel) = self
                .channels
                .iter()
                .find_map(|(&channel, queue)| (!queue.is_empty()).then_some(channel))
            else {
                return;
            };
            assert!(budget > 0, "channels never drained");
            budget -= 1;
            self.deliver(channel.0, channel.1);
        }
    }

    fn step(&mut self) {
        let mut moves = Vec::new();
        for (&(from, to), queue) in &self.channels {
            if !queue.is_empty() {
                moves.push(Move::Deliver { from, to });
            }
        }
        for (i, &phase) in self.phases.iter().enumerate() {
            match phase {
                Phase::Idle if self.remaining[i] > 0 => moves.push(Move::Request(i)),
                Phase::Holding => moves.push(Move::Unlock(i)),
                _ => {}
            }
        }
        assert!(!moves.is_empty(), "stuck: no event enabled, completed {:?}", self.completed);

        match moves[self.rng.random_range(0..moves.len())] {
            Move::Deliver { from, to } => self.deliver(from, to),
            Move::Request(i) => {
                self.remaining[i] -= 1;
                self.phases[i] = Phase::Waiting;
                let id = ProcessId::new(i as u32 + 1);
                let mut proxy = EnvProxy::new(id, self.config.processes);
                self.participants[i]
                    .on_lock_request(&mut proxy)
                    .expect("lock request violated the protocol");
                self.apply(id, proxy.effects);
            }
            Move::Unlock(i) => {
                let id = ProcessId::new(i as u32 + 1);
                let mut proxy = EnvProxy::new(id, self.config.processes);
                self.participants[i]
                    .on_unlock_request(&mut proxy)
                    .expect("unlock request violated the protocol");
                self.apply(id, proxy.effects);
            }
        }
        self.observe_tokens();
    }

    fn deliver(&mut self, from: ProcessId, to: ProcessId) {
        let message = self
            .channels
            .get_mut(&(from, to))
            .and_then(VecDeque::pop_front)
            .expect("delivering on an empty channel");
        let mut proxy = EnvProxy::new(to, self.config.processes);
        self.participants[to.get() as usize - 1]
            .on_message(&mut proxy, from, message)
            .expect("delivery violated the protocol");
        self.apply(to, proxy.effects);
    }

    fn apply(&mut self, id: ProcessId, effects: Vec<Effect>) {
        let i = id.get() as usize - 1;
        for effect in effects {
            match effect {
                Effect::Lock => {
                    assert_eq!(
                        self.holder, None,
                        "{id} entered while {:?} was inside",
                        self.holder,
                    );
                    assert_eq!(self.phases[i], Phase::Waiting, "{id} entered unrequested");
                    self.holder = Some(id);
                    self.phases[i] = Phase::Holding;
                }
                Effect::Unlock => {
                    assert_eq!(self.holder, Some(id), "{id} left without holding");
                    assert_eq!(self.phases[i], Phase::Holding);
                    self.holder = None;
                    self.phases[i] = Phase::Idle;
                    self.completed[i] += 1;
                }
                Effect::Send { to, message } => {
                    if to == id {
                        self.self_sends += 1;
                    }
                    self.channels.entry((id, to)).or_default().push_back(message);
                }
            }
        }
    }

    fn observe_tokens(&mut self) {
        let in_flight: usize = self
            .channels
            .values()
            .map(|queue| queue.iter().filter(|m| **m == Message::Token).count())
            .sum();
        let count = in_flight + usize::from(self.holder.is_some());
        self.tokens_min = self.tokens_min.min(count);
        self.tokens_max = self.tokens_max.max(count);
    }
}

/// Within one process the clock never goes backwards, and every delivery
/// strictly advances it.
pub fn assert_clock_monotonic(log: &EventLog) {
    let mut previous = None;
    for record in log.records() {
        if let Some(previous) = previous {
            assert!(
                record.clock >= previous,
                "clock went backwards: {} after {previous}",
                record.clock,
            );
            if matches!(record.event, ProcessEvent::Delivered { .. }) {
                assert!(
                    record.clock > previous,
                    "delivery did not advance the clock past {previous}",
                );
            }
        }
        previous = Some(record.clock);
    }
}
