use std::fmt::{self, Display, Formatter};

use crate::config::OverflowPolicy;
use crate::error::{Fault, TapeError};
use crate::isa::{Command, Inst};

/// Fixed-length, index-addressable input tape.
///
/// Reads are a single synchronous access: the address is issued and the value
/// captured in the same call, so a read always completes before the next step uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape<T> {
    cells: Vec<T>,
}

impl<T: Copy> Tape<T> {
    pub fn new(cells: Vec<T>) -> Tape<T> {
        Tape { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn read(&self, addr: u32) -> Option<T> {
        self.cells.get(addr as usize).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

pub type InstructionTape = Tape<Command>;
pub type OperandTape = Tape<u32>;

/// The paired instruction and operand tapes a run consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    commands: InstructionTape,
    values: OperandTape,
}

impl Program {
    pub fn new(commands: Vec<Command>, values: Vec<u32>, max_instructions: u32) -> Result<Program, TapeError> {
        if commands.len() != values.len() {
            return Err(TapeError::LengthMismatch {
                commands: commands.len(),
                values: values.len(),
            });
        }
        if commands.len() > max_instructions as usize {
            return Err(TapeError::TooManyInstructions {
                len: commands.len(),
                max_instructions,
            });
        }
        Ok(Program {
            commands: Tape::new(commands),
            values: Tape::new(values),
        })
    }

    /// Builds a program from raw 2-bit command codes.
    pub fn from_codes(codes: &[u32], values: Vec<u32>, max_instructions: u32) -> Result<Program, TapeError> {
        let commands = codes
            .iter()
            .enumerate()
            .map(|(index, &code)| {
                Command::try_from(code).map_err(|source| TapeError::InvalidCommand { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Program::new(commands, values, max_instructions)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &InstructionTape {
        &self.commands
    }

    pub fn values(&self) -> &OperandTape {
        &self.values
    }

    pub fn inst_at(&self, index: u32) -> Option<Inst> {
        let cmd = self.commands.read(index)?;
        let value = self.values.read(index)?;
        Some(Inst { index, cmd, value })
    }

    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        (0..self.len() as u32).filter_map(move |i| self.inst_at(i))
    }

    pub fn count_recording(&self) -> usize {
        self.commands.iter().filter(|cmd| cmd.records()).count()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for inst in self.insts() {
            writeln!(f, "{}", inst)?;
        }
        Ok(())
    }
}

/// Append-only output tape with a nominal capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTape {
    slots: Vec<u32>,
    capacity: u32,
    policy: OverflowPolicy,
    discarded: u32,
}

impl ResultTape {
    pub fn new(capacity: u32, policy: OverflowPolicy) -> ResultTape {
        ResultTape {
            slots: Vec::with_capacity(capacity as usize),
            capacity,
            policy,
            discarded: 0,
        }
    }

    /// Writes `value` at slot `j`. Slots are filled left to right, so `j` is
    /// always the next free slot unless earlier writes were discarded.
    pub fn write(&mut self, j: u32, value: u32) -> Result<(), Fault> {
        if j < self.capacity {
            self.slots.push(value);
            return Ok(());
        }
        match self.policy {
            OverflowPolicy::Fault => Err(Fault::ResultCapacityExceeded { capacity: self.capacity }),
            OverflowPolicy::Discard => {
                self.discarded += 1;
                Ok(())
            }
            OverflowPolicy::Grow => {
                self.slots.push(value);
                Ok(())
            }
        }
    }

    pub fn discarded(&self) -> u32 {
        self.discarded
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.slots
    }
}
