use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{DispatchConfig, OverflowPolicy, RecordPolicy};
use data::DataFile;
use dispatcher::Dispatcher;
use engine::EngineKind;

mod config;
mod constants;
mod data;
mod dispatcher;
mod engine;
mod error;
mod guard;
mod isa;
mod mem;

#[derive(Parser)]
#[command(name = "qdispatch")]
#[command(about = "Drive a queue engine from a command tape and collect its answers")]
struct Cli {
    /// More log output (-v debug, -vv per-step trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program and print the result tape
    Run {
        /// `.json` data file or text listing
        data: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Write the data file back out with `ans_mem` filled in
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the instruction listing of a program
    List {
        data: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    engine: Option<EngineKind>,
    #[arg(long)]
    max_instructions: Option<u32>,
    #[arg(long)]
    result_capacity: Option<u32>,
    #[arg(long)]
    engine_capacity: Option<usize>,
    /// always | skip-on-fault
    #[arg(long)]
    record_policy: Option<RecordPolicy>,
    /// fault | discard | grow
    #[arg(long = "overflow")]
    overflow_policy: Option<OverflowPolicy>,
}

impl ConfigArgs {
    fn resolve(&self) -> anyhow::Result<DispatchConfig> {
        let mut config = match &self.config {
            Some(path) => DispatchConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => DispatchConfig::default(),
        };
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(n) = self.max_instructions {
            config.max_instructions = n;
        }
        if let Some(n) = self.result_capacity {
            config.result_capacity = n;
        }
        if let Some(n) = self.engine_capacity {
            config.engine_capacity = n;
        }
        if let Some(policy) = self.record_policy {
            config.record_policy = policy;
        }
        if let Some(policy) = self.overflow_policy {
            config.overflow_policy = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { data: input, config, output } => {
            let config = config.resolve()?;
            let program = data::load_program(&input, config.max_instructions)
                .with_context(|| format!("loading {}", input.display()))?;
            if program.is_empty() {
                warn!(path = %input.display(), "program has no instructions");
            }
            info!(
                instructions = program.len(),
                answers = program.count_recording(),
                engine = %config.engine,
                "loaded program"
            );

            let engine = config.engine.build(config.engine_capacity);
            let mut dispatcher = Dispatcher::new(program.clone(), engine, &config);
            let report = dispatcher.run();
            debug!(status = ?dispatcher.status(), engine_len = dispatcher.engine().len(), "dispatcher finished");

            println!("results: {:?}", report.results);
            println!("instructions: {}", report.instructions_executed);
            println!("err: {}", report.err());
            if let Some(fault) = report.fault {
                println!("fault: {}", fault);
            }
            if report.discarded > 0 {
                println!("discarded: {}", report.discarded);
            }

            if let Some(path) = output {
                let json = DataFile::with_results(&program, &report, config.result_capacity).to_json()?;
                fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "wrote results");
            }
        }
        Commands::List { data: input, config } => {
            let config = config.resolve()?;
            let program = data::load_program(&input, config.max_instructions)
                .with_context(|| format!("loading {}", input.display()))?;
            print!("{}", program);
        }
    }
    Ok(())
}
