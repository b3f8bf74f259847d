use crate::{
    arg_setup::DEBUG_PRINT,
    Statistics,
    error::{ExecutionError, TargetFailure},
    mutator::MutationKind,
};

use std::error::Error;

use console::Term;
use num_format::{Locale, ToFormattedString};

/// Different log-types that can be used to print out messages in different colors
pub enum LogType {
    Neutral = 0,
    Success = 1,
    Failure = 2,
}

/// ANSI colors used for the log-tags
#[derive(Copy, Clone)]
pub enum Color {
    Green,
    Blue,
    Red,
}

/// Wrap `s` in the ANSI code for `color`, or return it as-is if the output stream does not
/// support colors
pub fn paint(color: Color, s: &str, enabled: bool) -> String {
    if !enabled {
        return s.to_string();
    }

    let code = match color {
        Color::Green => "32",
        Color::Blue  => "34",
        Color::Red   => "31",
    };
    format!("\x1B[{}m{}\x1B[0m", code, s)
}

fn tagged(color: LogType, msg: &str, colors: bool) -> String {
    match color {
        LogType::Neutral => format!("{} {}", paint(Color::Blue,  "[-]", colors), msg),
        LogType::Success => format!("{} {}", paint(Color::Green, "[+]", colors), msg),
        LogType::Failure => format!("{} {}", paint(Color::Red,   "[!]", colors), msg),
    }
}

/// Small wrapper to print out colored log messages. Failures go to stderr, everything else to
/// stdout, colors are decided per stream. Errors writing to the terminal are ignored, they should
/// never end a fuzz-run
pub fn log(color: LogType, msg: &str) {
    let (term, colors) = match color {
        LogType::Failure => (Term::stderr(), console::colors_enabled_stderr()),
        _ => (Term::stdout(), console::colors_enabled()),
    };
    let _ = term.write_line(&tagged(color, msg, colors));
}

/// Same as `log`, but only prints when debug-printing was requested on the command-line
pub fn dbg_log(color: LogType, msg: &str) {
    if DEBUG_PRINT.get().copied().unwrap_or(false) {
        log(color, msg);
    }
}

/// Report an execution error together with everything that caused it
pub fn print_execution_error(index: usize, kind: MutationKind, err: &ExecutionError) {
    let mut msg = format!("case {} ({}): {}", index, kind, err);
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(&format!("\n    caused by: {}", cause));
        source = cause.source();
    }
    log(LogType::Failure, &msg);
}

/// Dump the input that made the target fail, the output it produced and its exit code
pub fn print_failure(failure: &TargetFailure, rng_seed: u64) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("Input:\n{}\nOutput:\n{}", failure.input, failure.output));
    let _ = term.write_line(&format!("Exit code: {}", failure.exit_code));
    let _ = term.write_line("");

    log(LogType::Failure, &format!("{} (replay with --rng-seed {:#x})", failure, rng_seed));
}

/// Print a short summary once every case ran without the target failing
pub fn print_summary(stats: &Statistics) {
    log(LogType::Success, &format!("Ran {} cases with RNG seed {:#x}, target exited cleanly on \
        all of them", stats.total_cases.to_formatted_string(&Locale::en), stats.rng_seed));

    if stats.exec_errors != 0 {
        log(LogType::Neutral, &format!("{} cases could not be executed",
            stats.exec_errors.to_formatted_string(&Locale::en)));
    }
}
