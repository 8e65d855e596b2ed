//! Random forest: bootstrap-bagged Gini trees with √p feature subsampling.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use cribrum_common::Result;

use super::tree::DecisionTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    max_depth: Option<usize>,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        let max_features = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());
            let mut tree = DecisionTree::classifier(self.max_depth, 2);
            tree.fit_rows(
                x,
                y,
                None,
                &bootstrap,
                Some(max_features),
                &mut Some(&mut tree_rng),
            )?;
            self.trees.push(tree);
        }
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_fitted())
    }

    /// Probability of the positive class: mean leaf value across trees.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut probs = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            probs += &tree.predict(x);
        }
        probs / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_forest_learns_separable_data() {
        let x = arr2(&[
            [0.1, 0.9],
            [0.2, 0.8],
            [0.15, 0.95],
            [0.9, 0.1],
            [0.8, 0.2],
            [0.95, 0.15],
        ]);
        let y = arr1(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let mut forest = RandomForest::new(25, Some(3), 42);
        forest.fit(&x, &y).unwrap();
        let probs = forest.predict_proba(&x);
        for (p, t) in probs.iter().zip(y.iter()) {
            assert_eq!((*p > 0.5) as i32 as f64, *t);
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn test_forest_is_deterministic_for_fixed_seed() {
        let x = arr2(&[[0.0], [0.3], [0.7], [1.0]]);
        let y = arr1(&[0.0, 0.0, 1.0, 1.0]);
        let mut a = RandomForest::new(10, None, 7);
        let mut b = RandomForest::new(10, None, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x), b.predict_proba(&x));
    }
}
