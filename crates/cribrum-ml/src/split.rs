//! Seeded train/test splitting and stratified k-fold iteration.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use cribrum_common::{CribrumError, Result};

#[derive(Debug, Clone)]
pub struct DataSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffled split; test size = round(fraction × n), at least one row on
/// each side.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<DataSplit> {
    let n = x.nrows();
    if n < 2 {
        return Err(CribrumError::Pipeline(format!(
            "cannot split {} rows into train and test",
            n
        )));
    }

    let test_size = ((test_fraction * n as f64).round() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(test_size);
    Ok(DataSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: select_1d(y, train_idx),
        y_test: select_1d(y, test_idx),
    })
}

fn select_1d(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_iter(indices.iter().map(|&i| y[i]))
}

/// Stratified k-fold: each class is shuffled independently and dealt
/// round-robin across folds, so every fold keeps the class balance.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// (train_indices, test_indices) per fold.
    pub fn split(&self, y: &Array1<f64>) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];

        for class in [0.0, 1.0] {
            let mut members: Vec<usize> = (0..y.len())
                .filter(|&i| (y[i] - class).abs() < 0.5)
                .collect();
            members.shuffle(&mut rng);
            for (pos, i) in members.into_iter().enumerate() {
                fold_members[pos % self.n_splits].push(i);
            }
        }

        (0..self.n_splits)
            .map(|fold| {
                let test = fold_members[fold].clone();
                let train = fold_members
                    .iter()
                    .enumerate()
                    .filter(|(f, _)| *f != fold)
                    .flat_map(|(_, members)| members.iter().copied())
                    .collect();
                (train, test)
            })
            .collect()
    }
}

/// Row subset of a matrix/label pair.
pub fn take_rows(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), indices), select_1d(y, indices))
}
