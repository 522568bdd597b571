//! Tape data files.
//!
//! The JSON layout is the memory-file layout hardware simulators read: one
//! object per memory, each holding its `data` and a numeric `format`.
//!
//! ```json
//! {
//!   "commands": { "data": [2, 2, 0, 1], "format": { "numeric_type": "bitnum", "is_signed": false, "width": 2 } },
//!   "values":   { "data": [5, 9, 0, 0], "format": { "numeric_type": "bitnum", "is_signed": false, "width": 32 } },
//!   "ans_mem":  { "data": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0], "format": { "numeric_type": "bitnum", "is_signed": false, "width": 32 } }
//! }
//! ```
//!
//! Programs can also be written as text, one instruction per line (`push 5`,
//! `pop`, `peek`), with `;` or `#` starting a comment.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{COMMANDS_MEM, VALUES_MEM};
use crate::dispatcher::RunReport;
use crate::error::DataError;
use crate::isa::Command;
use crate::mem::Program;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub numeric_type: String,
    pub is_signed: bool,
    pub width: u32,
}

impl Format {
    pub fn bitnum(width: u32) -> Format {
        Format {
            numeric_type: "bitnum".to_string(),
            is_signed: false,
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub data: Vec<u32>,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    pub commands: Option<Memory>,
    pub values: Option<Memory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ans_mem: Option<Memory>,
}

impl DataFile {
    pub fn from_json(text: &str) -> Result<DataFile, DataError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_program(&self, max_instructions: u32) -> Result<Program, DataError> {
        let commands = self.commands.as_ref().ok_or(DataError::MissingMemory(COMMANDS_MEM))?;
        let values = self.values.as_ref().ok_or(DataError::MissingMemory(VALUES_MEM))?;
        Ok(Program::from_codes(&commands.data, values.data.clone(), max_instructions)?)
    }

    /// Data file for a finished run: the input tapes plus `ans_mem`, zero-padded to
    /// the nominal result capacity.
    pub fn with_results(program: &Program, report: &RunReport, result_capacity: u32) -> DataFile {
        let mut answers = report.results.clone();
        if answers.len() < result_capacity as usize {
            answers.resize(result_capacity as usize, 0);
        }
        DataFile {
            commands: Some(Memory {
                data: program.commands().iter().map(|cmd| cmd.code() as u32).collect(),
                format: Format::bitnum(2),
            }),
            values: Some(Memory {
                data: program.values().iter().copied().collect(),
                format: Format::bitnum(32),
            }),
            ans_mem: Some(Memory {
                data: answers,
                format: Format::bitnum(32),
            }),
        }
    }
}

fn parse_operand(word: &str) -> Result<u32, String> {
    let parsed = match word.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => word.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid operand {:?}: {}", word, e))
}

fn parse_line(line: &str) -> Result<Option<(Command, u32)>, String> {
    let line = line.split(|c| c == ';' || c == '#').next().unwrap_or("");
    let words: Vec<&str> = line.split_ascii_whitespace().collect();
    let (verb, args) = match words.split_first() {
        None => return Ok(None),
        Some(split) => split,
    };
    let cmd: Command = verb.parse()?;
    match (cmd.takes_operand(), args) {
        (true, [value]) => Ok(Some((cmd, parse_operand(value)?))),
        (false, []) => Ok(Some((cmd, 0))),
        (true, _) => Err(format!("{} takes exactly one operand, got {}", cmd, args.len())),
        (false, _) => Err(format!("{} takes no operand, got {}", cmd, args.len())),
    }
}

pub fn parse_text(text: &str, max_instructions: u32) -> Result<Program, DataError> {
    let mut commands = Vec::new();
    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some((cmd, value))) => {
                commands.push(cmd);
                values.push(value);
            }
            Ok(None) => {}
            Err(reason) => return Err(DataError::Syntax { line: line_no + 1, reason }),
        }
    }
    Ok(Program::new(commands, values, max_instructions)?)
}

/// Loads a program from a `.json` data file or a text listing.
pub fn load_program(path: &Path, max_instructions: u32) -> Result<Program, DataError> {
    let text = fs::read_to_string(path)?;
    let is_json = path.extension().map_or(false, |ext| ext == "json");
    if is_json {
        DataFile::from_json(&text)?.to_program(max_instructions)
    } else {
        parse_text(&text, max_instructions)
    }
}
