use pipefuzz::{
    error_exit,
    arg_setup::{handle_cli, parse_cli},
    execution::run_campaign,
    mutator::InputBatch,
    pretty_printing::{log, print_failure, print_summary, LogType},
};

fn main() {
    // Parse commandline-args and verify that the target exists before anything is spawned
    let args = parse_cli();
    let config = handle_cli(args).unwrap_or_else(|err| error_exit(&err.to_string()));

    log(LogType::Neutral, &format!("Command: {}", config.target));
    log(LogType::Neutral, &format!("RNG seed: {:#x}", config.rng_seed));

    // All inputs are generated up-front, there is no feedback from the executions
    let batch = InputBatch::generate(&config.seed, config.rng_seed);

    match run_campaign(&config.target, &batch) {
        Ok(stats) => print_summary(&stats),
        Err(failure) => {
            print_failure(&failure, batch.rng_seed);
            std::process::exit(failure.exit_code);
        },
    }
}
