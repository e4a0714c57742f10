// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles examples with a seeded RNG and splits off a test set:
//   - Training set: used to update model weights
//   - Test set:     held out for evaluation and comparison
//
// The test split gets ceil(n * test_fraction) examples and the
// rest go to training, so a non-empty dataset with a positive
// fraction always yields at least one test example.
//
// The same seed always produces the same split, which keeps
// "the first test question" stable across runs.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed used for the split when none is configured.
pub const SPLIT_SEED: u64 = 123;

/// Fraction of examples held out for testing.
pub const TEST_FRACTION: f64 = 0.1;

/// Shuffle `samples` with `seed` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total  = samples.len();
    let n_test = ((total as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = n_test.min(total);

    // split_off(n) keeps [0..n) in `samples` and returns [n..total)
    let test = samples.split_off(total - n_test);

    tracing::debug!(
        "Dataset split: {} train, {} test (seed {})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}
