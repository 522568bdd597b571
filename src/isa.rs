use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A queue command, stored on the instruction tape as a 2-bit code.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Command {
    Pop = 0,
    Peek = 1,
    Push = 2,
}

impl Command {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::Pop => "pop",
            Command::Peek => "peek",
            Command::Push => "push",
        }
    }

    /// Pop and Peek hand an answer back that goes onto the result tape.
    pub const fn records(self) -> bool {
        self.code() <= Command::Peek.code()
    }

    pub const fn takes_operand(self) -> bool {
        matches!(self, Command::Push)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct InvalidCode(pub u32);

impl Display for InvalidCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid command code {} (expected 0=pop, 1=peek, 2=push)", self.0)
    }
}

impl std::error::Error for InvalidCode {}

impl TryFrom<u32> for Command {
    type Error = InvalidCode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Command::Pop),
            1 => Ok(Command::Peek),
            2 => Ok(Command::Push),
            other => Err(InvalidCode(other)),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = InvalidCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Command::try_from(code as u32)
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pop" => Ok(Command::Pop),
            "peek" => Ok(Command::Peek),
            "push" => Ok(Command::Push),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Inst {
    pub index: u32,
    pub cmd: Command,
    pub value: u32,
}

impl Display for Inst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.cmd.takes_operand() {
            write!(f, "{:04}: {:4} {}", self.index, self.cmd.name(), self.value)
        } else {
            write!(f, "{:04}: {}", self.index, self.cmd.name())
        }
    }
}
