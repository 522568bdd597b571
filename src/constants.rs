pub const MAX_CMDS: u32 = 15;
pub const ANS_MEM_LEN: u32 = 10;

pub const DEFAULT_ENGINE_CAPACITY: usize = 16;

pub const COMMANDS_MEM: &str = "commands";
pub const VALUES_MEM: &str = "values";
