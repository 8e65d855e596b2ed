//! Hyperparameter search by stratified cross-validated accuracy.

use ndarray::{Array1, Array2};
use tracing::{debug, info, warn};

use cribrum_common::Result;

use crate::models::{Classifier, Family, ModelParams, MODEL_SEED};
use crate::split::{take_rows, StratifiedKFold};

/// Upper bound on the fold count; shrunk when a class has fewer rows.
pub const MAX_CV_FOLDS: usize = 10;

#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub params: ModelParams,
    pub model: Classifier,
    pub cv_accuracy: f64,
}

/// Exhaustive search over `family.grid()`, scoring each candidate by mean
/// stratified k-fold accuracy and refitting the winner on all rows.
///
/// Ties keep the earlier grid point. With too few rows for even two folds
/// the candidate is scored on its own training data instead.
pub fn grid_search(
    family: Family,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<GridSearchResult> {
    let n_folds = fold_count(y);
    if n_folds < 2 {
        warn!(
            family = %family,
            "too few rows per class for cross-validation, scoring on training data"
        );
    }

    let mut best: Option<(ModelParams, f64)> = None;
    for params in family.grid() {
        let accuracy = if n_folds < 2 {
            train_accuracy(params, x, y)?
        } else {
            cv_accuracy(params, x, y, n_folds)?
        };
        debug!(family = %family, ?params, accuracy, "scored grid point");
        if best.map_or(true, |(_, prev)| accuracy > prev) {
            best = Some((params, accuracy));
        }
    }

    // Family grids are never empty.
    let (params, cv_accuracy) = best.expect("empty hyperparameter grid");
    info!(family = %family, ?params, cv_accuracy, "selected hyperparameters");

    let mut model = params.build();
    model.fit(x, y)?;
    Ok(GridSearchResult {
        params,
        model,
        cv_accuracy,
    })
}

/// Fold count clamped to the smallest class size.
fn fold_count(y: &Array1<f64>) -> usize {
    let pos = y.iter().filter(|&&v| v > 0.5).count();
    let neg = y.len() - pos;
    MAX_CV_FOLDS.min(pos.min(neg))
}

fn cv_accuracy(
    params: ModelParams,
    x: &Array2<f64>,
    y: &Array1<f64>,
    n_folds: usize,
) -> Result<f64> {
    let folds = StratifiedKFold::new(n_folds, MODEL_SEED).split(y);
    let mut total = 0.0;
    for (train_idx, test_idx) in &folds {
        let (x_train, y_train) = take_rows(x, y, train_idx);
        let (x_test, y_test) = take_rows(x, y, test_idx);
        let mut model = params.build();
        model.fit(&x_train, &y_train)?;
        total += accuracy(&model.predict(&x_test), &y_test);
    }
    Ok(total / folds.len() as f64)
}

fn train_accuracy(params: ModelParams, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
    let mut model = params.build();
    model.fit(x, y)?;
    Ok(accuracy(&model.predict(x), y))
}

fn accuracy(y_pred: &Array1<f64>, y_true: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_pred
        .iter()
        .zip(y_true)
        .filter(|(p, t)| (*p > &0.5) == (*t > &0.5))
        .count();
    hits as f64 / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};

    fn separable(n_per_class: usize) -> (Array2<f64>, Array1<f64>) {
        let n = 2 * n_per_class;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = if i < n_per_class { 0.1 } else { 0.9 };
            base + 0.01 * (i as f64) + 0.005 * (j as f64)
        });
        let y = Array1::from_iter((0..n).map(|i| if i < n_per_class { 0.0 } else { 1.0 }));
        (x, y)
    }

    #[test]
    fn test_fold_count_clamps_to_smallest_class() {
        assert_eq!(fold_count(&arr1(&[1.0, 1.0, 0.0, 0.0, 0.0])), 2);
        assert_eq!(fold_count(&arr1(&[1.0, 0.0])), 1);
        let big = Array1::from_iter((0..40).map(|i| (i % 2) as f64));
        assert_eq!(fold_count(&big), MAX_CV_FOLDS);
    }

    #[test]
    fn test_search_fits_a_usable_model() {
        let (x, y) = separable(12);
        let result = grid_search(Family::Logistic, &x, &y).unwrap();
        assert!(result.cv_accuracy > 0.9);
        let preds = result.model.predict(&x);
        assert_eq!(preds, y);
    }

    #[test]
    fn test_search_survives_tiny_datasets() {
        // One row per class: no folds possible, falls back to train score.
        let (x, y) = separable(1);
        let result = grid_search(Family::DecisionTree, &x, &y).unwrap();
        assert!(result.cv_accuracy >= 0.0);
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = separable(10);
        let a = grid_search(Family::RandomForest, &x, &y).unwrap();
        let b = grid_search(Family::RandomForest, &x, &y).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.cv_accuracy, b.cv_accuracy);
    }
}
