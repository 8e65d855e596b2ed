//! Synthetic minority oversampling (SMOTE).
//!
//! Equalises the class counts by interpolating new minority rows between a
//! random minority sample and one of its k nearest minority neighbours.
//! Seeded for reproducible runs; k is clamped to the available neighbour
//! count, degrading to plain duplication when the minority class has a
//! single row.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use cribrum_common::{CribrumError, Result};

/// Neighbour count used for interpolation (before clamping).
pub const DEFAULT_K: usize = 5;

/// Oversample the minority class until both classes have equal counts.
///
/// Original rows keep their order; synthetic rows are appended.
pub fn resample(
    x: &Array2<f64>,
    y: &Array1<f64>,
    k: usize,
    seed: u64,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let positives: Vec<usize> = (0..y.len()).filter(|&i| y[i] > 0.5).collect();
    let negatives: Vec<usize> = (0..y.len()).filter(|&i| y[i] <= 0.5).collect();

    if positives.is_empty() || negatives.is_empty() {
        return Err(CribrumError::Pipeline(
            "resampling requires both classes to be present".to_string(),
        ));
    }

    let (minority, minority_label) = if positives.len() < negatives.len() {
        (&positives, 1.0)
    } else if negatives.len() < positives.len() {
        (&negatives, 0.0)
    } else {
        // Already balanced.
        return Ok((x.clone(), y.clone()));
    };

    let need = positives.len().abs_diff(negatives.len());
    let k_eff = k.min(minority.len() - 1);
    debug!(
        synthetic = need,
        k = k_eff,
        "balancing classes with synthetic minority samples"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut synthetic = Array2::<f64>::zeros((need, x.ncols()));

    for s in 0..need {
        let &base = &minority[rng.gen_range(0..minority.len())];
        let row = if k_eff == 0 {
            // Single minority row: duplicate it.
            x.row(base).to_owned()
        } else {
            let neighbour = nearest_neighbours(x, base, minority, k_eff)
                [rng.gen_range(0..k_eff)];
            let gap: f64 = rng.gen();
            let a = x.row(base);
            let b = x.row(neighbour);
            Array1::from_iter(a.iter().zip(b.iter()).map(|(va, vb)| va + gap * (vb - va)))
        };
        synthetic.row_mut(s).assign(&row);
    }

    let x_out = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])
        .map_err(|e| CribrumError::Pipeline(format!("resample concatenation failed: {}", e)))?;
    let mut y_out = y.to_vec();
    y_out.extend(std::iter::repeat(minority_label).take(need));

    Ok((x_out, Array1::from_vec(y_out)))
}

/// Indices of the k nearest same-class neighbours of `base` (excluding
/// itself), by Euclidean distance.
fn nearest_neighbours(x: &Array2<f64>, base: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    let mut distances: Vec<(usize, f64)> = candidates
        .iter()
        .filter(|&&i| i != base)
        .map(|&i| {
            let d: f64 = x
                .row(base)
                .iter()
                .zip(x.row(i).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (i, d)
        })
        .collect();
    distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    distances.truncate(k);
    distances.into_iter().map(|(i, _)| i).collect()
}
