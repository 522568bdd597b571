use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineFault};
use crate::isa::Command;

/// The queue-like structure a run drives.
///
/// `Ok(Some(ans))` answers a Pop or Peek, `Ok(None)` acknowledges a Push. The engine
/// reads `value` only for Push.
pub trait Engine {
    fn apply(&mut self, cmd: Command, value: u32) -> Result<Option<u32>, EngineFault>;

    fn len(&self) -> usize;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn apply(&mut self, cmd: Command, value: u32) -> Result<Option<u32>, EngineFault> {
        (**self).apply(cmd, value)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Bounded first-in first-out queue.
#[derive(Debug, Clone)]
pub struct Fifo {
    items: VecDeque<u32>,
    capacity: usize,
}

impl Fifo {
    pub fn new(capacity: usize) -> Fifo {
        Fifo {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl Engine for Fifo {
    fn apply(&mut self, cmd: Command, value: u32) -> Result<Option<u32>, EngineFault> {
        match cmd {
            Command::Pop => self.items.pop_front().map(Some).ok_or(EngineFault::Underflow),
            Command::Peek => self.items.front().copied().map(Some).ok_or(EngineFault::Underflow),
            Command::Push => {
                if self.items.len() >= self.capacity {
                    return Err(EngineFault::Overflow { capacity: self.capacity });
                }
                self.items.push_back(value);
                Ok(None)
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Bounded last-in first-out stack.
#[derive(Debug, Clone)]
pub struct Lifo {
    items: Vec<u32>,
    capacity: usize,
}

impl Lifo {
    pub fn new(capacity: usize) -> Lifo {
        Lifo {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }
}

impl Engine for Lifo {
    fn apply(&mut self, cmd: Command, value: u32) -> Result<Option<u32>, EngineFault> {
        match cmd {
            Command::Pop => self.items.pop().map(Some).ok_or(EngineFault::Underflow),
            Command::Peek => self.items.last().copied().map(Some).ok_or(EngineFault::Underflow),
            Command::Push => {
                if self.items.len() >= self.capacity {
                    return Err(EngineFault::Overflow { capacity: self.capacity });
                }
                self.items.push(value);
                Ok(None)
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Fifo,
    Lifo,
}

impl EngineKind {
    pub fn build(self, capacity: usize) -> Box<dyn Engine> {
        match self {
            EngineKind::Fifo => Box::new(Fifo::new(capacity)),
            EngineKind::Lifo => Box::new(Lifo::new(capacity)),
        }
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" | "queue" => Ok(EngineKind::Fifo),
            "lifo" | "stack" => Ok(EngineKind::Lifo),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Fifo => "fifo",
            EngineKind::Lifo => "lifo",
        })
    }
}
