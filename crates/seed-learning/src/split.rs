//! Train/test split and k-fold partitioning.

use crate::error::{LearningError, Result};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with a seeded ChaCha RNG and hold out
/// `ceil(n_rows * test_size)` rows for testing.
pub fn train_test_split(n_rows: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    let n_test = (n_rows as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(LearningError::InvalidData(format!(
            "cannot hold out {n_test} of {n_rows} rows for testing"
        )));
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    rows.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train = rows.split_off(n_test);
    Ok(TrainTestSplit { train, test: rows })
}

/// One cross-validation fold, as positions into the training rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Contiguous, unshuffled k-fold partition of `0..n_rows`.
///
/// The first `n_rows % k` folds get one extra row.
pub fn k_fold(n_rows: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(LearningError::InvalidConfig(
            "cv_folds must be at least 2".to_string(),
        ));
    }
    if n_rows < k {
        return Err(LearningError::InvalidData(format!(
            "cannot split {n_rows} training rows into {k} folds"
        )));
    }

    let base = n_rows / k;
    let extra = n_rows % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < extra);
        let end = start + size;
        folds.push(Fold {
            train: (0..start).chain(end..n_rows).collect(),
            validation: (start..end).collect(),
        });
        start = end;
    }
    Ok(folds)
}
