//! This file contains some configurables that you may want to edit depending on the target you are
//! fuzzing

/// Seed input that every mutation is derived from, unless a seed file is passed on the
/// command-line
pub const SEED_INPUT: &str = "<html a=\"value\">...</html>";

/// Substring that the `ExcessiveLength` and `InvalidChars` mutations replace. Only the first
/// occurrence is replaced, if the seed does not contain it these mutations return the seed as-is
pub const REPLACE_TOKEN: &str = "value";

/// Number of times a character/string is repeated by the mutations that blow up the input size
pub const REPEAT_COUNT: usize = 100;

/// Number of times the 5-mutation cycle is appended to the batch after the single
/// excessive-length case. With 20 cycles this results in 101 mutated inputs
pub const MUTATION_CYCLES: usize = 20;

/// Directory the target is started in, and against which the command path is resolved
pub const WORKING_DIR: &str = "./";
