use crate::{
    configurables::{SEED_INPUT, WORKING_DIR},
    error::UsageError,
    execution::{LaunchMode, TargetCommand},
};
use clap::{ErrorKind, Parser};

use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A line is printed for every executed fuzz-case, not just failures
pub static DEBUG_PRINT: OnceLock<bool> = OnceLock::new();

/// Used by clap to parse command-line arguments
#[derive(Debug, Parser)]
#[clap(version, about = "Black-box mutation fuzzer that feeds inputs to a target over stdin")]
#[clap(override_usage = "pipefuzz [OPTIONS] <COMMAND> [-- <TARGET_ARGS>...]\n\n    \
    ex: pipefuzz ./test_cases/html_parser")]
pub struct Cli {
    #[clap(value_name = "COMMAND", forbid_empty_values = true)]
    /// - Path to the target, relative to the working directory
    pub command: String,

    #[clap(value_name = "TARGET_ARGS", last = true)]
    /// - Additional arguments passed to the target
    pub target_args: Vec<String>,

    #[clap(short = 's', long, value_name = "FILE", help_heading = "CONFIG",
           forbid_empty_values = true)]
    /// - Read the seed input from this file instead of using the built-in html snippet
    pub seed_file: Option<PathBuf>,

    #[clap(short = 'r', long, value_name = "N", help_heading = "CONFIG",
           parse(try_from_str = parse_rng_seed))]
    /// - Seed for the mutation generator (decimal or 0x-prefixed hex). Random if not given
    pub rng_seed: Option<u64>,

    #[clap(long, help_heading = "CONFIG", takes_value = false)]
    /// - Execute the target directly instead of through the system shell
    pub direct: bool,

    #[clap(short = 'D', long, help_heading = "CONFIG", takes_value = false)]
    /// - Print a line for every executed case
    pub debug_print: bool,
}

fn parse_rng_seed(s: &str) -> Result<u64, ParseIntError> {
    parse_int::parse::<u64>(s)
}

/// Fully resolved configuration for a fuzz-run
#[derive(Debug, Clone)]
pub struct FuzzConfig {
    pub target:   TargetCommand,
    pub seed:     String,
    pub rng_seed: u64,
}

/// Parse the command-line. Usage errors exit with status 1, `--help`/`--version` with 0
pub fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            },
        },
    }
}

/// Initialize configuration variables based on passed in commandline arguments, and verify that
/// the user properly setup their fuzz-case
pub fn handle_cli(args: Cli) -> Result<FuzzConfig, UsageError> {
    let _ = DEBUG_PRINT.set(args.debug_print);

    // The target is resolved against the directory it will be started in
    if !Path::new(WORKING_DIR).join(&args.command).exists() {
        return Err(UsageError::CommandNotFound(args.command));
    }

    let seed = match args.seed_file {
        Some(path) => {
            let seed = std::fs::read_to_string(&path)
                .map_err(|source| UsageError::SeedFile { path: path.clone(), source })?;
            if seed.is_empty() {
                return Err(UsageError::EmptySeed { path });
            }
            seed
        },
        None => SEED_INPUT.to_string(),
    };

    let mode = if args.direct { LaunchMode::Direct } else { LaunchMode::Shell };

    Ok(FuzzConfig {
        target:   TargetCommand::new(args.command, args.target_args, mode)?,
        seed,
        rng_seed: args.rng_seed.unwrap_or_else(rand::random),
    })
}
