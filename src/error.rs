use std::io;

use thiserror::Error;

use crate::isa::InvalidCode;

/// Fault reported by a queue engine.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum EngineFault {
    #[error("engine underflow: pop or peek on an empty structure")]
    Underflow,
    #[error("engine overflow: push at capacity {capacity}")]
    Overflow { capacity: usize },
}

/// Why a run ended in error.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum Fault {
    #[error("instruction ceiling of {max_instructions} reached")]
    InstructionCeilingReached { max_instructions: u32 },
    #[error(transparent)]
    Engine(#[from] EngineFault),
    #[error("result tape capacity of {capacity} exceeded")]
    ResultCapacityExceeded { capacity: u32 },
}

impl Fault {
    pub fn is_engine_fault(&self) -> bool {
        matches!(self, Fault::Engine(_))
    }
}

/// Sticky error flag shared by the run loop, the bounds guard and the engine.
///
/// The first fault raised is kept for the rest of the run. Nothing can lower the flag
/// except starting a new run.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct ErrorFlag(Option<Fault>);

impl ErrorFlag {
    /// Raises the flag. Returns false if it was already up, in which case the
    /// first fault is kept.
    pub fn raise(&mut self, fault: Fault) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(fault);
        true
    }

    pub fn fault(&self) -> Option<Fault> {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TapeError {
    #[error("instruction tape has {commands} entries but operand tape has {values}")]
    LengthMismatch { commands: usize, values: usize },
    #[error("program has {len} instructions, more than the ceiling of {max_instructions}")]
    TooManyInstructions { len: usize, max_instructions: u32 },
    #[error("instruction {index}: {source}")]
    InvalidCommand { index: usize, source: InvalidCode },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_instructions must be at least 1")]
    ZeroInstructionCeiling,
    #[error("engine_capacity must be at least 1")]
    ZeroEngineCapacity,
    #[error("unknown engine: {0}")]
    UnknownEngine(String),
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed data file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("data file has no `{0}` memory")]
    MissingMemory(&'static str),
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
    #[error(transparent)]
    Tape(#[from] TapeError),
}
