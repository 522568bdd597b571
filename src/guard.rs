use crate::error::Fault;

/// Stops a run once the instruction index reaches the ceiling.
///
/// Checked after the index has been advanced, so it fires on the step that
/// consumed the last legal instruction, once that step's effects are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsGuard {
    max_instructions: u32,
}

impl BoundsGuard {
    pub fn new(max_instructions: u32) -> BoundsGuard {
        BoundsGuard { max_instructions }
    }

    pub fn check(&self, index: u32) -> Result<(), Fault> {
        if index == self.max_instructions {
            return Err(Fault::InstructionCeilingReached {
                max_instructions: self.max_instructions,
            });
        }
        Ok(())
    }
}
