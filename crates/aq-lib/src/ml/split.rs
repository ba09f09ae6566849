//! Seeded train/test partitioning

use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(test_fraction * n)` rows
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(PipelineError::Shape(format!(
            "test fraction {} is outside (0, 1)",
            test_fraction
        )));
    }
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::EmptyDataset(format!(
            "{} rows are too few for a {:.0}% hold-out",
            n,
            test_fraction * 100.0
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}
