//! CART decision tree.
//!
//! One tree type serves two roles: Gini splits with mean-label leaves for
//! classification, and MSE splits for the regression trees inside the
//! boosting family. Leaves always store a single value — for classification
//! that value is the positive-class fraction, which doubles as the
//! predicted probability.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use cribrum_common::{CribrumError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    Gini,
    Mse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    criterion: SplitCriterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn classifier(max_depth: Option<usize>, min_samples_split: usize) -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth,
            min_samples_split,
            root: None,
        }
    }

    pub fn regressor(max_depth: Option<usize>) -> Self {
        Self {
            criterion: SplitCriterion::Mse,
            max_depth,
            min_samples_split: 2,
            root: None,
        }
    }

    /// Fit on all rows, considering every feature at every split.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, None, &indices, None, &mut None)
    }

    /// Fit on a row subset with optional per-split feature subsampling
    /// (used by the forest) and optional per-sample hessian weights
    /// (used by the boosting family for Newton leaf values).
    pub fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        hessians: Option<&Array1<f64>>,
        indices: &[usize],
        max_features: Option<usize>,
        rng: &mut Option<&mut StdRng>,
    ) -> Result<()> {
        if indices.is_empty() {
            return Err(CribrumError::Pipeline(
                "cannot fit a decision tree on zero rows".to_string(),
            ));
        }
        self.root = Some(self.build_node(x, y, hessians, indices, 0, max_features, rng));
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self.root.as_ref().expect("tree not fitted");
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::from_iter(x.rows().into_iter().map(|r| self.predict_row(r)))
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        hessians: Option<&Array1<f64>>,
        indices: &[usize],
        depth: usize,
        max_features: Option<usize>,
        rng: &mut Option<&mut StdRng>,
    ) -> Node {
        let leaf = Node::Leaf {
            value: leaf_value(y, hessians, indices),
        };

        if indices.len() < self.min_samples_split {
            return leaf;
        }
        if let Some(limit) = self.max_depth {
            if depth >= limit {
                return leaf;
            }
        }
        if is_pure(y, indices) {
            return leaf;
        }

        let features = self.candidate_features(x.ncols(), max_features, rng);
        let Some((feature, threshold)) = best_split(x, y, indices, &features, self.criterion)
        else {
            return leaf;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| x[[i, feature]] <= threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return leaf;
        }

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build_node(x, y, hessians, &left_idx, depth + 1, max_features, rng)),
            right: Box::new(self.build_node(
                x,
                y,
                hessians,
                &right_idx,
                depth + 1,
                max_features,
                rng,
            )),
        }
    }

    fn candidate_features(
        &self,
        n_features: usize,
        max_features: Option<usize>,
        rng: &mut Option<&mut StdRng>,
    ) -> Vec<usize> {
        let all: Vec<usize> = (0..n_features).collect();
        match (max_features, rng) {
            (Some(k), Some(rng)) if k < n_features => {
                let mut chosen = all;
                chosen.shuffle(rng);
                chosen.truncate(k);
                chosen.sort_unstable();
                chosen
            }
            _ => all,
        }
    }
}

/// Leaf prediction: mean target, or the Newton step Σg/Σh when hessians are
/// supplied by the boosting family.
fn leaf_value(y: &Array1<f64>, hessians: Option<&Array1<f64>>, indices: &[usize]) -> f64 {
    match hessians {
        Some(h) => {
            let num: f64 = indices.iter().map(|&i| y[i]).sum();
            let den: f64 = indices.iter().map(|&i| h[i]).sum();
            if den.abs() < 1e-12 {
                0.0
            } else {
                num / den
            }
        }
        None => indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64,
    }
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    let first = y[indices[0]];
    indices.iter().all(|&i| (y[i] - first).abs() < 1e-12)
}

/// Exhaustive split search over midpoint thresholds of the candidate
/// features; returns the split with the lowest weighted child impurity.
fn best_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    indices: &[usize],
    features: &[usize],
    criterion: SplitCriterion,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;

    for &feature in features {
        let mut values: Vec<(f64, f64)> =
            indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
        values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for w in values.windows(2) {
            if (w[1].0 - w[0].0).abs() < 1e-12 {
                continue;
            }
            let threshold = (w[0].0 + w[1].0) / 2.0;
            let (left, right) = split_targets(&values, threshold);
            let n = values.len() as f64;
            let score = (left.len() as f64 / n) * impurity(&left, criterion)
                + (right.len() as f64 / n) * impurity(&right, criterion);
            if best.map_or(true, |(_, _, s)| score < s) {
                best = Some((feature, threshold, score));
            }
        }
    }

    best.map(|(f, t, _)| (f, t))
}

/// Partition the (value, target) pairs at the threshold, keeping targets.
fn split_targets(values: &[(f64, f64)], threshold: f64) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &(v, target) in values {
        if v <= threshold {
            left.push(target);
        } else {
            right.push(target);
        }
    }
    (left, right)
}

fn impurity(targets: &[f64], criterion: SplitCriterion) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let n = targets.len() as f64;
    match criterion {
        SplitCriterion::Gini => {
            let p = targets.iter().sum::<f64>() / n;
            1.0 - p * p - (1.0 - p) * (1.0 - p)
        }
        SplitCriterion::Mse => {
            let mean = targets.iter().sum::<f64>() / n;
            targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n
        }
    }
}
