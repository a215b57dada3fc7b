//! Recording [`Environment`] for unit tests.

use crate::messages::Message;
use crate::traits::{Environment, ProcessId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnvCall {
    Lock,
    Unlock,
    Send { to: ProcessId, message: Message },
}

/// An [`Environment`] that records every effect instead of performing it.
pub struct FakeEnv {
    id: ProcessId,
    count: u32,
    pub calls: Vec<EnvCall>,
}

impl FakeEnv {
    pub fn new(id: u32, count: u32) -> Self {
        Self {
            id: ProcessId::new(id),
            count,
            calls: Vec::new(),
        }
    }

    /// Messages sent so far, as `(destination, message)` pairs.
    pub fn sent(&self) -> Vec<(ProcessId, Message)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EnvCall::Send { to, message } => Some((*to, *message)),
                _ => None,
            })
            .collect()
    }

    pub fn locks(&self) -> usize {
        self.calls.iter().filter(|c| **c == EnvCall::Lock).count()
    }

    pub fn unlocks(&self) -> usize {
        self.calls.iter().filter(|c| **c == EnvCall::Unlock).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Environment for FakeEnv {
    fn process_id(&self) -> ProcessId {
        self.id
    }

    fn process_count(&self) -> u32 {
        self.count
    }

    fn lock(&mut self) {
        self.calls.push(EnvCall::Lock);
    }

    fn unlock(&mut self) {
        self.calls.push(EnvCall::Unlock);
    }

    fn send(&mut self, destination: ProcessId, message: Message) {
        self.calls.push(EnvCall::Send {
            to: destination,
            message,
        });
    }
}
