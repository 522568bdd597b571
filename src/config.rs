//! Run configuration.
//!
//! Defaults are the fixed sizes the hardware driver was built with: 15
//! instructions, 10 result slots, a FIFO engine. Any field can be set from a TOML file and
//! then overridden on the command line.
//!
//! ```toml
//! max_instructions = 15
//! result_capacity = 10
//! engine = "fifo"
//! engine_capacity = 16
//! record_policy = "always"
//! overflow_policy = "fault"
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ANS_MEM_LEN, DEFAULT_ENGINE_CAPACITY, MAX_CMDS};
use crate::engine::EngineKind;
use crate::error::{ConfigError, DataError};

/// What RECORD does when the engine faulted during the same step.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordPolicy {
    /// Record the answer register anyway. It still holds the last good answer.
    Always,
    /// Leave the result tape and `j` untouched.
    SkipOnFault,
}

/// What happens when a Pop/Peek answer lands past the result tape's capacity.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Raise `ResultCapacityExceeded` and end the run.
    Fault,
    /// Drop the answer; `j` still advances.
    Discard,
    /// Keep writing past the nominal capacity.
    Grow,
}

impl FromStr for RecordPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(RecordPolicy::Always),
            "skip-on-fault" => Ok(RecordPolicy::SkipOnFault),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fault" => Ok(OverflowPolicy::Fault),
            "discard" => Ok(OverflowPolicy::Discard),
            "grow" => Ok(OverflowPolicy::Grow),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Instruction-count ceiling checked after every step.
    pub max_instructions: u32,
    /// Nominal number of result slots.
    pub result_capacity: u32,
    pub engine: EngineKind,
    pub engine_capacity: usize,
    pub record_policy: RecordPolicy,
    pub overflow_policy: OverflowPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            max_instructions: MAX_CMDS,
            result_capacity: ANS_MEM_LEN,
            engine: EngineKind::default(),
            engine_capacity: DEFAULT_ENGINE_CAPACITY,
            record_policy: RecordPolicy::Always,
            overflow_policy: OverflowPolicy::Fault,
        }
    }
}

impl DispatchConfig {
    pub fn from_toml(text: &str) -> Result<Self, DataError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_instructions == 0 {
            return Err(ConfigError::ZeroInstructionCeiling);
        }
        if self.engine_capacity == 0 {
            return Err(ConfigError::ZeroEngineCapacity);
        }
        Ok(())
    }
}
