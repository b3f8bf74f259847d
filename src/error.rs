//! Error kinds produced while setting up and running a fuzz-campaign. The driver logs and skips
//! `ExecutionError`s, a `TargetFailure` ends the run

use crate::mutator::MutationKind;

use thiserror::Error;

use std::io;
use std::path::PathBuf;

/// Invalid command-line usage. Always fatal, the fuzzer exits with status 1
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Could not find command '{0}'.")]
    CommandNotFound(String),

    #[error("Failed to read seed file '{}': {source}", path.display())]
    SeedFile {
        path:   PathBuf,
        source: io::Error,
    },

    #[error("Target arguments can't be passed through the shell: {0}")]
    TargetArgs(String),

    #[error("Seed file '{}' is empty, mutations need at least 1 character to work with",
            path.display())]
    EmptySeed {
        path: PathBuf,
    },
}

/// Something went wrong while driving the target process itself. These are logged and the
/// campaign moves on to the next case
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to spawn target '{program}'")]
    Spawn {
        program: String,
        #[source]
        source:  io::Error,
    },

    #[error("failed to set up the output pipe")]
    Pipe(#[source] io::Error),

    #[error("failed to write fuzz-input to target stdin")]
    WriteInput(#[source] io::Error),

    #[error("failed to read target output")]
    ReadOutput(#[source] io::Error),

    #[error("failed while waiting for the target to exit")]
    Wait(#[source] io::Error),

    #[error("stdin writer thread panicked")]
    WriterPanicked,
}

/// The target exited with a non-zero exit code on one of our inputs. This ends the campaign
#[derive(Debug, Error)]
#[error("case {index} ({kind}) made the target exit with code {exit_code}")]
pub struct TargetFailure {
    /// Position of the case in the run, 0 is the unmodified seed
    pub index:     usize,

    /// Mutation that produced the input
    pub kind:      MutationKind,

    /// The exact input that was written to the target
    pub input:     String,

    /// Combined stdout/stderr of the target
    pub output:    String,

    /// Exit code reported by the target
    pub exit_code: i32,
}
