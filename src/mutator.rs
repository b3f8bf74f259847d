//! Fixed, stateless string mutations that are applied to the seed input to build the batch of
//! fuzz-cases. All randomness comes from a single seeded generator that is threaded through the
//! batch generation, so the whole batch can be reproduced from its `rng_seed`

use crate::configurables::{MUTATION_CYCLES, REPEAT_COUNT, REPLACE_TOKEN};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use core::fmt;

/// The different mutation strategies. `Seed` marks the unmodified seed input
#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum MutationKind {
    /// Unmodified seed
    Seed,

    /// Replace the first `value` with a long run of `A`'s
    ExcessiveLength,

    /// Repeat the entire seed
    SpecialChars,

    /// Remove a random contiguous slice
    DeleteChars,

    /// Insert a long run of `>>` at a random position
    MalformedHtml,

    /// Replace the first `value` with NUL-bytes
    InvalidChars,

    /// Pick a random character and insert a run of it at another random position
    DuplicateChar,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MutationKind::Seed            => "seed",
            MutationKind::ExcessiveLength => "excessive-length",
            MutationKind::SpecialChars    => "special-chars",
            MutationKind::DeleteChars     => "delete-chars",
            MutationKind::MalformedHtml   => "malformed-html",
            MutationKind::InvalidChars    => "invalid-chars",
            MutationKind::DuplicateChar   => "duplicate-char",
        };
        write!(f, "{}", name)
    }
}

/// Mutations that are repeated `MUTATION_CYCLES` times, in this order, after the initial
/// excessive-length case
pub const MUTATION_CYCLE: [MutationKind; 5] = [
    MutationKind::SpecialChars,
    MutationKind::DeleteChars,
    MutationKind::MalformedHtml,
    MutationKind::InvalidChars,
    MutationKind::DuplicateChar,
];

/// Byte offset of the `idx`'th character in `input`, or the length of `input` if `idx` is one
/// past the last character
fn byte_offset(input: &str, idx: usize) -> usize {
    input.char_indices().nth(idx).map(|(off, _)| off).unwrap_or(input.len())
}

/// Replace the first occurrence of `value` with `REPEAT_COUNT` `A`'s
pub fn excessive_length(input: &str) -> String {
    input.replacen(REPLACE_TOKEN, &"A".repeat(REPEAT_COUNT), 1)
}

/// Concatenate the input with itself `REPEAT_COUNT` times
pub fn special_chars(input: &str) -> String {
    input.repeat(REPEAT_COUNT)
}

/// Delete a random, non-empty, contiguous slice of the input
pub fn delete_chars<R: Rng>(input: &str, rng: &mut R) -> String {
    let len = input.chars().count();
    if len == 0 {
        return input.to_string();
    }

    let start   = rng.gen_range(0..len);
    let del_len = rng.gen_range(1..=len - start);

    let mut mutated = input.to_string();
    mutated.replace_range(byte_offset(input, start)..byte_offset(input, start + del_len), "");
    mutated
}

/// Insert `REPEAT_COUNT` repetitions of `>>` at a random position, including the very end
pub fn malformed_html<R: Rng>(input: &str, rng: &mut R) -> String {
    let len = input.chars().count();
    let pos = rng.gen_range(0..=len);

    let mut mutated = input.to_string();
    mutated.insert_str(byte_offset(input, pos), &">>".repeat(REPEAT_COUNT));
    mutated
}

/// Replace the first occurrence of `value` with 3 NUL characters
pub fn invalid_chars(input: &str) -> String {
    input.replacen(REPLACE_TOKEN, "\0\0\0", 1)
}

/// Pick a random character from the input and insert `REPEAT_COUNT` copies of it at a second,
/// independently chosen position
pub fn duplicate_char<R: Rng>(input: &str, rng: &mut R) -> String {
    let len = input.chars().count();
    if len == 0 {
        return input.to_string();
    }

    let picked = rng.gen_range(0..len);
    let dup = match input.chars().nth(picked) {
        Some(c) => c.to_string().repeat(REPEAT_COUNT),
        None    => return input.to_string(),
    };
    let pos = rng.gen_range(0..len);

    let mut mutated = input.to_string();
    mutated.insert_str(byte_offset(input, pos), &dup);
    mutated
}

/// Applies mutations to a seed using one generator for the entire batch
pub struct Mutator {
    rng:      Xoshiro256PlusPlus,
    rng_seed: u64,
}

impl Mutator {
    /// Create a new mutator whose random decisions are fully determined by `rng_seed`
    pub fn new(rng_seed: u64) -> Self {
        Mutator {
            rng: Xoshiro256PlusPlus::seed_from_u64(rng_seed),
            rng_seed,
        }
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Apply a single mutation of type `kind` to `seed`
    pub fn mutate(&mut self, kind: MutationKind, seed: &str) -> String {
        match kind {
            MutationKind::Seed            => seed.to_string(),
            MutationKind::ExcessiveLength => excessive_length(seed),
            MutationKind::SpecialChars    => special_chars(seed),
            MutationKind::DeleteChars     => delete_chars(seed, &mut self.rng),
            MutationKind::MalformedHtml   => malformed_html(seed, &mut self.rng),
            MutationKind::InvalidChars    => invalid_chars(seed),
            MutationKind::DuplicateChar   => duplicate_char(seed, &mut self.rng),
        }
    }
}

/// Single generated input alongside the mutation that produced it
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MutatedInput {
    pub kind: MutationKind,
    pub data: String,
}

/// One test case handed to the execution driver
#[derive(Debug, Clone, Copy)]
pub struct TestCase<'a> {
    /// Position in the run, 0 is the seed
    pub index: usize,
    pub kind:  MutationKind,
    pub input: &'a str,
}

/// The full, ordered set of inputs for one fuzzing run
#[derive(Debug, Clone)]
pub struct InputBatch {
    /// Seed used for the generator, print this to reproduce a run
    pub rng_seed:  u64,

    /// Unmodified seed input, always executed first
    pub seed:      String,

    /// Mutated inputs in generation order
    pub mutations: Vec<MutatedInput>,
}

impl InputBatch {
    /// Generate the batch: 1 excessive-length case followed by `MUTATION_CYCLES` repetitions of
    /// `MUTATION_CYCLE`. Every mutation is applied to the original seed
    pub fn generate(seed: &str, rng_seed: u64) -> Self {
        let mut mutator = Mutator::new(rng_seed);

        let kinds = std::iter::once(MutationKind::ExcessiveLength)
            .chain(MUTATION_CYCLE.iter().copied().cycle().take(MUTATION_CYCLE.len() * MUTATION_CYCLES));

        let mutations = kinds
            .map(|kind| MutatedInput { kind, data: mutator.mutate(kind, seed) })
            .collect();

        InputBatch {
            rng_seed: mutator.rng_seed(),
            seed:     seed.to_string(),
            mutations,
        }
    }

    /// Total number of cases, including the seed
    pub fn len(&self) -> usize {
        self.mutations.len() + 1
    }

    /// Iterate over all cases in execution order, starting with the seed
    pub fn cases(&self) -> impl Iterator<Item = TestCase<'_>> {
        std::iter::once((MutationKind::Seed, self.seed.as_str()))
            .chain(self.mutations.iter().map(|m| (m.kind, m.data.as_str())))
            .enumerate()
            .map(|(index, (kind, input))| TestCase { index, kind, input })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurables::SEED_INPUT;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(0x1337)
    }

    #[test]
    fn excessive_length_replaces_first_value() {
        let out = excessive_length(SEED_INPUT);
        assert_eq!(out, format!("<html a=\"{}\">...</html>", "A".repeat(100)));

        let out = excessive_length("value value");
        assert_eq!(out, format!("{} value", "A".repeat(100)));
    }

    #[test]
    fn token_mutations_are_noops_without_value() {
        let seed = "<p>nothing here</p>";
        assert_eq!(excessive_length(seed), seed);
        assert_eq!(invalid_chars(seed), seed);
    }

    #[test]
    fn invalid_chars_inserts_nuls() {
        assert_eq!(invalid_chars(SEED_INPUT), "<html a=\"\0\0\0\">...</html>");
    }

    #[test]
    fn special_chars_repeats_seed() {
        let out = special_chars(SEED_INPUT);
        assert_eq!(out.len(), SEED_INPUT.len() * 100);
        assert!(out.starts_with(SEED_INPUT) && out.ends_with(SEED_INPUT));
    }

    #[test]
    fn delete_chars_always_shrinks() {
        let mut rng = rng();
        for _ in 0..500 {
            let out = delete_chars(SEED_INPUT, &mut rng);
            assert!(out.len() < SEED_INPUT.len());
        }
        assert_eq!(delete_chars("x", &mut rng), "");
    }

    #[test]
    fn malformed_html_adds_200_chars() {
        let mut rng = rng();
        for _ in 0..100 {
            let out = malformed_html(SEED_INPUT, &mut rng);
            assert_eq!(out.len(), SEED_INPUT.len() + 200);
            assert!(out.contains(&">>".repeat(100)));
        }
        assert_eq!(malformed_html("", &mut rng), ">>".repeat(100));
    }

    #[test]
    fn duplicate_char_inserts_run_of_seed_char() {
        let mut rng = rng();
        for _ in 0..100 {
            let out = duplicate_char(SEED_INPUT, &mut rng);
            assert_eq!(out.len(), SEED_INPUT.len() + 100);
            assert!(out.chars().all(|c| SEED_INPUT.contains(c)));
        }
    }

    #[test]
    fn randomized_mutations_tolerate_empty_seed() {
        let mut rng = rng();
        assert_eq!(delete_chars("", &mut rng), "");
        assert_eq!(duplicate_char("", &mut rng), "");
    }

    #[test]
    fn multibyte_seed_is_not_split() {
        let seed = "ä€😀value";
        let mut rng = rng();
        for _ in 0..200 {
            let out = delete_chars(seed, &mut rng);
            assert!(out.chars().count() < seed.chars().count());

            let out = duplicate_char(seed, &mut rng);
            assert_eq!(out.chars().count(), seed.chars().count() + 100);

            let out = malformed_html(seed, &mut rng);
            assert_eq!(out.chars().count(), seed.chars().count() + 200);
        }
    }

    #[test]
    fn batch_has_expected_shape() {
        let batch = InputBatch::generate(SEED_INPUT, 42);
        assert_eq!(batch.mutations.len(), 101);
        assert_eq!(batch.len(), 102);
        assert_eq!(batch.mutations[0].kind, MutationKind::ExcessiveLength);

        for (i, m) in batch.mutations[1..].iter().enumerate() {
            assert_eq!(m.kind, MUTATION_CYCLE[i % 5]);
        }

        let cases: Vec<_> = batch.cases().collect();
        assert_eq!(cases.len(), 102);
        assert_eq!(cases[0].kind, MutationKind::Seed);
        assert_eq!(cases[0].input, SEED_INPUT);
        assert_eq!(cases[2].kind, MutationKind::SpecialChars);
        assert!(cases.iter().enumerate().all(|(i, c)| c.index == i));
    }

    #[test]
    fn same_rng_seed_reproduces_batch() {
        let a = InputBatch::generate(SEED_INPUT, 0xdeadbeef);
        let b = InputBatch::generate(SEED_INPUT, 0xdeadbeef);
        assert_eq!(a.mutations, b.mutations);
        assert_eq!(a.rng_seed, 0xdeadbeef);
    }
}
