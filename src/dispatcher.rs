use std::fmt::{self, Debug, Formatter};

use tracing::{debug, info, trace};

use Status::*;

use crate::config::{DispatchConfig, RecordPolicy};
use crate::engine::Engine;
use crate::error::{ErrorFlag, Fault};
use crate::guard::BoundsGuard;
use crate::isa::{Command, Inst};
use crate::mem::{Program, ResultTape};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Status {
    Idle,
    Running,
    /// The program ran out before the instruction ceiling did.
    Stopped,
    Error(Fault),
}

/// Outcome of a single fault-free step.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Step {
    Executed { inst: Inst, recorded: Option<u32> },
    Halted,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunReport {
    pub results: Vec<u32>,
    pub fault: Option<Fault>,
    /// Final value of the instruction cursor `i`.
    pub instructions_executed: u32,
    /// Final value of the result cursor `j`. Exceeds `results.len()` when answers were discarded.
    pub results_written: u32,
    pub discarded: u32,
}

impl RunReport {
    pub fn err(&self) -> bool {
        self.fault.is_some()
    }
}

/// Feeds a program to an engine one instruction at a time and collects its answers.
pub struct Dispatcher<E: Engine> {
    program: Program,
    engine: E,
    guard: BoundsGuard,
    results: ResultTape,
    record_policy: RecordPolicy,
    err: ErrorFlag,
    status: Status,
    i: u32,
    j: u32,
    cmd: Command,
    value: u32,
    ans: u32,
}

impl<E: Engine> Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("status", &self.status)
            .field("i", &self.i)
            .field("j", &self.j)
            .field("cmd", &self.cmd)
            .field("value", &self.value)
            .field("ans", &self.ans)
            .field("results", &self.results.as_slice())
            .field("engine_len", &self.engine.len())
            .finish()
    }
}

impl<E: Engine> Dispatcher<E> {
    pub fn new(program: Program, engine: E, config: &DispatchConfig) -> Dispatcher<E> {
        Dispatcher {
            program,
            engine,
            guard: BoundsGuard::new(config.max_instructions),
            results: ResultTape::new(config.result_capacity, config.overflow_policy),
            record_policy: config.record_policy,
            err: ErrorFlag::default(),
            status: Idle,
            i: 0,
            j: 0,
            cmd: Command::Pop,
            value: 0,
            ans: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn raise(&mut self, fault: Fault) {
        if self.err.raise(fault) {
            debug!(i = self.i, j = self.j, %fault, engine = fault.is_engine_fault(), "error flag raised");
        } else {
            debug!(i = self.i, %fault, "error flag already raised, keeping first fault");
        }
        if let Some(first) = self.err.fault() {
            self.status = Error(first);
        }
    }

    /// Runs one READ, DISPATCH, RECORD, ADVANCE, GUARD iteration.
    ///
    /// Returns the fault once the error flag is up; every later call returns the same fault.
    pub fn step(&mut self) -> Result<Step, Fault> {
        if let Some(fault) = self.err.fault() {
            return Err(fault);
        }
        if self.status == Stopped {
            return Ok(Step::Halted);
        }
        self.status = Running;

        let inst = match self.program.inst_at(self.i) {
            Some(inst) => inst,
            None => {
                self.status = Stopped;
                return Ok(Step::Halted);
            }
        };
        self.cmd = inst.cmd;
        self.value = inst.value;

        let mut engine_faulted = false;
        match self.engine.apply(self.cmd, self.value) {
            Ok(Some(ans)) => self.ans = ans,
            Ok(None) => {}
            Err(fault) => {
                engine_faulted = true;
                self.raise(Fault::Engine(fault));
            }
        }

        let mut recorded = None;
        let skip = engine_faulted && self.record_policy == RecordPolicy::SkipOnFault;
        if self.cmd.records() && !skip {
            match self.results.write(self.j, self.ans) {
                Ok(()) => {
                    recorded = Some(self.ans);
                    self.j += 1;
                }
                Err(fault) => self.raise(fault),
            }
        }

        self.i += 1;
        if let Err(fault) = self.guard.check(self.i) {
            self.raise(fault);
        }

        match self.err.fault() {
            Some(fault) => Err(fault),
            None => Ok(Step::Executed { inst, recorded }),
        }
    }

    pub fn run(&mut self) -> RunReport {
        loop {
            match self.step() {
                Ok(Step::Executed { inst, recorded }) => {
                    trace!(%inst, ?recorded, i = self.i, j = self.j, "step");
                }
                Ok(Step::Halted) | Err(_) => break,
            }
        }
        let report = self.report();
        info!(
            instructions = report.instructions_executed,
            results = report.results_written,
            fault = ?report.fault,
            "run finished"
        );
        report
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            results: self.results.as_slice().to_vec(),
            fault: self.err.fault(),
            instructions_executed: self.i,
            results_written: self.j,
            discarded: self.results.discarded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::config::OverflowPolicy;
    use crate::engine::{Fifo, Lifo};
    use crate::error::EngineFault;

    use super::*;
    use Command::*;

    fn config() -> DispatchConfig {
        DispatchConfig::default()
    }

    fn dispatcher(cmds: Vec<Command>, values: Vec<u32>, config: &DispatchConfig) -> Dispatcher<Fifo> {
        let program = Program::new(cmds, values, config.max_instructions).unwrap();
        Dispatcher::new(program, Fifo::new(config.engine_capacity), config)
    }

    #[test]
    fn test_push_push_pop_peek() {
        let mut d = dispatcher(vec![Push, Push, Pop, Peek], vec![5, 9, 0, 0], &config());
        let report = d.run();
        assert_eq!(report.results, vec![5, 9]);
        assert!(!report.err());
        assert_eq!(report.instructions_executed, 4);
        assert_eq!(d.status(), Stopped);
    }

    #[test]
    fn test_peek_then_pop_two_values() {
        let mut d = dispatcher(vec![Push, Push, Peek, Pop], vec![5, 9, 0, 0], &config());
        assert_eq!(d.run().results, vec![5, 5]);
    }

    #[test]
    fn test_fifo_round_trip() {
        let mut d = dispatcher(vec![Push, Push, Push, Pop, Pop, Pop], vec![1, 2, 3, 0, 0, 0], &config());
        let report = d.run();
        assert_eq!(report.results, vec![1, 2, 3]);
        assert_eq!(report.fault, None);
    }

    #[test]
    fn test_peek_then_pop_single_value() {
        let mut d = dispatcher(vec![Push, Peek, Pop], vec![42, 0, 0], &config());
        assert_eq!(d.run().results, vec![42, 42]);
        assert_eq!(d.engine().len(), 0);
    }

    #[test]
    fn test_full_tape_hits_ceiling() {
        let config = config();
        let mut cmds = vec![Push; 8];
        cmds.extend(vec![Pop; 7]);
        let values = (0..15).collect();
        let mut d = dispatcher(cmds, values, &config);
        let report = d.run();
        assert_eq!(report.instructions_executed, 15);
        assert_eq!(report.results, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(report.fault, Some(Fault::InstructionCeilingReached { max_instructions: 15 }));
        assert!(!report.fault.unwrap().is_engine_fault());
    }

    #[test]
    fn test_all_push_records_nothing() {
        let mut d = dispatcher(vec![Push; 15], (100..115).collect(), &config());
        let report = d.run();
        assert!(report.results.is_empty());
        assert_eq!(report.results_written, 0);
        assert_eq!(d.engine().len(), 15);
    }

    #[test]
    fn test_pop_on_empty_still_records_stale_answer() {
        // The answer register was never written, so its initial 0 lands on the tape.
        let mut d = dispatcher(vec![Pop, Push], vec![0, 7], &config());
        let report = d.run();
        assert_eq!(report.fault, Some(Fault::Engine(EngineFault::Underflow)));
        assert_eq!(report.results, vec![0]);
        assert_eq!(report.results_written, 1);
        assert_eq!(report.instructions_executed, 1);
    }

    #[test]
    fn test_underflow_records_previous_answer() {
        let mut d = dispatcher(vec![Push, Pop, Pop], vec![8, 0, 0], &config());
        let report = d.run();
        assert_eq!(report.results, vec![8, 8]);
        assert!(report.fault.unwrap().is_engine_fault());
    }

    #[test]
    fn test_skip_on_fault_suppresses_record() {
        let config = DispatchConfig { record_policy: RecordPolicy::SkipOnFault, ..config() };
        let mut d = dispatcher(vec![Push, Pop, Pop], vec![8, 0, 0], &config);
        let report = d.run();
        assert_eq!(report.results, vec![8]);
        assert_eq!(report.results_written, 1);
        assert_eq!(report.instructions_executed, 3);
    }

    #[test]
    fn test_engine_overflow_ends_run() {
        let config = DispatchConfig { engine_capacity: 1, ..config() };
        let mut d = dispatcher(vec![Push, Push, Pop], vec![1, 2, 0], &config);
        let report = d.run();
        assert_eq!(report.fault, Some(Fault::Engine(EngineFault::Overflow { capacity: 1 })));
        assert_eq!(report.instructions_executed, 2);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_engine_fault_on_last_instruction_keeps_engine_reason() {
        let config = DispatchConfig { max_instructions: 2, ..config() };
        let mut d = dispatcher(vec![Push, Pop], vec![1, 0], &config);
        assert_eq!(d.run().fault, Some(Fault::InstructionCeilingReached { max_instructions: 2 }));

        // Underflow and the ceiling land on the same step; the engine fault was raised first.
        let config = DispatchConfig { max_instructions: 1, ..config };
        let mut d = dispatcher(vec![Pop], vec![0], &config);
        assert_eq!(d.step(), Err(Fault::Engine(EngineFault::Underflow)));
        assert_eq!(d.report().instructions_executed, 1);
        assert_eq!(d.run().fault, Some(Fault::Engine(EngineFault::Underflow)));
    }

    #[test]
    fn test_result_overflow_faults_by_default() {
        let config = DispatchConfig { result_capacity: 2, ..config() };
        let mut d = dispatcher(vec![Push, Peek, Peek, Peek, Pop], vec![3, 0, 0, 0, 0], &config);
        let report = d.run();
        assert_eq!(report.results, vec![3, 3]);
        assert_eq!(report.fault, Some(Fault::ResultCapacityExceeded { capacity: 2 }));
        assert_eq!(report.results_written, 2);
        assert_eq!(report.instructions_executed, 4);
    }

    #[test]
    fn test_default_config_faults_past_ten_answers() {
        let mut cmds = vec![Push];
        cmds.extend(vec![Peek; 11]);
        let mut d = dispatcher(cmds, vec![1; 12], &config());
        let report = d.run();
        assert_eq!(report.results, vec![1; 10]);
        assert_eq!(report.fault, Some(Fault::ResultCapacityExceeded { capacity: 10 }));
        assert_eq!(report.instructions_executed, 12);
    }

    #[test]
    fn test_result_overflow_discard() {
        let config = DispatchConfig {
            result_capacity: 2,
            overflow_policy: OverflowPolicy::Discard,
            ..config()
        };
        let mut d = dispatcher(vec![Push, Peek, Peek, Peek, Pop], vec![3, 0, 0, 0, 0], &config);
        let report = d.run();
        assert_eq!(report.results, vec![3, 3]);
        assert_eq!(report.fault, None);
        assert_eq!(report.results_written, 4);
        assert_eq!(report.discarded, 2);
    }

    #[test]
    fn test_result_overflow_grow() {
        let config = DispatchConfig {
            result_capacity: 2,
            overflow_policy: OverflowPolicy::Grow,
            ..config()
        };
        let mut d = dispatcher(vec![Push, Peek, Peek, Peek, Pop], vec![3, 0, 0, 0, 0], &config);
        let report = d.run();
        assert_eq!(report.results, vec![3, 3, 3, 3]);
        assert_eq!(report.results_written, 4);
        assert_eq!(report.fault, None);
    }

    #[test]
    fn test_flag_is_sticky_across_steps() {
        let mut d = dispatcher(vec![Pop, Push, Push], vec![0, 1, 2], &config());
        let fault = d.step().unwrap_err();
        assert_eq!(d.step(), Err(fault));
        assert_eq!(d.step(), Err(fault));
        assert_eq!(d.report().instructions_executed, 1);
        assert_eq!(d.status(), Error(fault));
        assert_eq!(d.engine().len(), 0);
    }

    #[test]
    fn test_step_outcomes() {
        let mut d = dispatcher(vec![Push, Peek], vec![6, 0], &config());
        assert_eq!(d.status(), Idle);
        assert_eq!(
            d.step(),
            Ok(Step::Executed { inst: Inst { index: 0, cmd: Push, value: 6 }, recorded: None })
        );
        assert_eq!(d.status(), Running);
        assert_eq!(
            d.step(),
            Ok(Step::Executed { inst: Inst { index: 1, cmd: Peek, value: 0 }, recorded: Some(6) })
        );
        assert_eq!(d.step(), Ok(Step::Halted));
        assert_eq!(d.step(), Ok(Step::Halted));
        assert_eq!(d.report().results_written, 1);
    }

    #[test]
    fn test_empty_program() {
        let mut d = dispatcher(vec![], vec![], &config());
        let report = d.run();
        assert_eq!(report, RunReport {
            results: vec![],
            fault: None,
            instructions_executed: 0,
            results_written: 0,
            discarded: 0,
        });
    }

    #[test]
    fn test_lifo_engine() {
        let config = config();
        let program = Program::new(vec![Push, Push, Pop, Pop], vec![1, 2, 0, 0], 15).unwrap();
        let mut d = Dispatcher::new(program, Lifo::new(4), &config);
        assert_eq!(d.run().results, vec![2, 1]);
    }

    #[test]
    fn test_boxed_engine() {
        let config = DispatchConfig { engine: crate::engine::EngineKind::Lifo, ..config() };
        let program = Program::new(vec![Push, Push, Peek], vec![1, 2, 0], 15).unwrap();
        let engine = config.engine.build(config.engine_capacity);
        let mut d = Dispatcher::new(program, engine, &config);
        assert_eq!(d.run().results, vec![2]);
    }

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![Just(Pop), Just(Peek), Just(Push)]
    }

    proptest! {
        #[test]
        fn prop_fault_free_runs_record_every_pop_and_peek(
            cmds in prop::collection::vec(command(), 0..15),
            seed in any::<u32>(),
        ) {
            // Only pop or peek what was pushed, so the engine never underflows.
            let mut depth = 0usize;
            let cmds: Vec<Command> = cmds
                .into_iter()
                .map(|cmd| {
                    let cmd = if cmd != Push && depth == 0 { Push } else { cmd };
                    match cmd {
                        Push => depth += 1,
                        Pop => depth -= 1,
                        Peek => {}
                    }
                    cmd
                })
                .collect();
            let values: Vec<u32> = (0..cmds.len() as u32).map(|k| seed.wrapping_add(k)).collect();
            let expected = cmds.iter().filter(|cmd| cmd.records()).count();

            // Up to 14 answers; the default 10 slots would end longer runs with
            // ResultCapacityExceeded.
            let config = DispatchConfig { result_capacity: 15, ..config() };
            let mut d = dispatcher(cmds.clone(), values, &config);
            let report = d.run();
            prop_assert!(!report.err());
            prop_assert_eq!(report.results.len(), expected);
            prop_assert_eq!(report.instructions_executed as usize, cmds.len());
        }

        #[test]
        fn prop_all_push_never_records(len in 1usize..=15) {
            let mut d = dispatcher(vec![Push; len], vec![1; len], &config());
            let report = d.run();
            prop_assert!(report.results.is_empty());
            prop_assert_eq!(report.fault.is_some(), len == 15);
        }
    }
}
