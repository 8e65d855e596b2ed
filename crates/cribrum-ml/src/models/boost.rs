//! Gradient-boosted trees on the logistic loss.
//!
//! Each round fits a shallow MSE tree to the negative gradient (residual
//! y − p) with Newton leaf values Σ(y−p)/Σp(1−p); the boosted score is
//! squashed through a sigmoid for the probability output.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use cribrum_common::{CribrumError, Result};

use super::logistic::sigmoid;
use super::tree::DecisionTree;

/// Depth of the weak learners. Kept shallow on purpose.
const WEAK_LEARNER_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    init_score: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            init_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(CribrumError::Pipeline(
                "cannot fit gradient boosting on zero rows".to_string(),
            ));
        }

        let base_rate = (y.sum() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        self.init_score = (base_rate / (1.0 - base_rate)).ln();

        let indices: Vec<usize> = (0..n).collect();
        let mut scores = Array1::from_elem(n, self.init_score);

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let probs = scores.mapv(sigmoid);
            let residuals = y - &probs;
            let hessians = probs.mapv(|p| (p * (1.0 - p)).max(1e-12));

            let mut tree = DecisionTree::regressor(Some(WEAK_LEARNER_DEPTH));
            tree.fit_rows(x, &residuals, Some(&hessians), &indices, None, &mut None)?;

            let update = tree.predict(x);
            scores += &(update * self.learning_rate);
            self.trees.push(tree);
        }
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_fitted())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut scores = Array1::from_elem(x.nrows(), self.init_score);
        for tree in &self.trees {
            scores += &(tree.predict(x) * self.learning_rate);
        }
        scores.mapv(sigmoid)
    }
}
