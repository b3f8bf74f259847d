pub mod arg_setup;
pub mod configurables;
pub mod error;
pub mod execution;
pub mod mutator;
pub mod pretty_printing;

use pretty_printing::{log, LogType};

/// Counters collected over one fuzz-run
#[derive(Default, Debug, Copy, Clone)]
pub struct Statistics {
    /// Seed of the generator that produced this run's inputs
    pub rng_seed: u64,

    /// Cases that were attempted, including the ones that hit an execution error
    pub total_cases: usize,

    /// Cases that could not be executed (spawn/pipe/wait failures)
    pub exec_errors: usize,
}

impl Statistics {
    pub fn new(rng_seed: u64) -> Self {
        Statistics { rng_seed, ..Default::default() }
    }
}

/// Print an error message and exit with status 1
pub fn error_exit(msg: &str) -> ! {
    log(LogType::Failure, msg);
    std::process::exit(1);
}
