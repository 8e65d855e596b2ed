//! The six classifier families and their hyperparameter registry.
//!
//! Families are addressed by a short stable id (`LR`, `NB`, `DT`, `RF`,
//! `SVM`, `GBT`) that also keys artifact filenames and prediction columns.
//! `Family::grid()` is the single place the search space is defined; adding
//! a family means adding a variant here, nothing else branches per family.

pub mod boost;
pub mod forest;
pub mod logistic;
pub mod naive_bayes;
pub mod svm;
pub mod tree;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use cribrum_common::Result;

use boost::GradientBoosting;
use forest::RandomForest;
use logistic::LogisticRegression;
use naive_bayes::GaussianNb;
use svm::{Kernel, Svc};
use tree::DecisionTree;

/// Seed used by the stochastic families so a run is reproducible.
pub const MODEL_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Logistic,
    NaiveBayes,
    DecisionTree,
    RandomForest,
    Svm,
    GradientBoosting,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Logistic,
        Family::NaiveBayes,
        Family::DecisionTree,
        Family::RandomForest,
        Family::Svm,
        Family::GradientBoosting,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Family::Logistic => "LR",
            Family::NaiveBayes => "NB",
            Family::DecisionTree => "DT",
            Family::RandomForest => "RF",
            Family::Svm => "SVM",
            Family::GradientBoosting => "GBT",
        }
    }

    pub fn from_id(id: &str) -> Option<Family> {
        Family::ALL.iter().copied().find(|f| f.id() == id)
    }

    /// The fixed hyperparameter grid searched for this family.
    pub fn grid(&self) -> Vec<ModelParams> {
        match self {
            Family::Logistic => [0.1, 1.0, 10.0]
                .iter()
                .map(|&c| ModelParams::Logistic { c })
                .collect(),
            Family::NaiveBayes => [1e-2, 1e-5, 1e-9, 1e-15]
                .iter()
                .map(|&var_smoothing| ModelParams::NaiveBayes { var_smoothing })
                .collect(),
            Family::DecisionTree => {
                let mut grid = Vec::new();
                for &max_depth in &[3usize, 5, 10] {
                    for &min_samples_split in &[2usize, 5, 10] {
                        grid.push(ModelParams::DecisionTree {
                            max_depth: Some(max_depth),
                            min_samples_split,
                        });
                    }
                }
                grid
            }
            Family::RandomForest => {
                let mut grid = Vec::new();
                for &n_estimators in &[50usize, 100, 200] {
                    for &max_depth in &[None, Some(10usize), Some(20)] {
                        grid.push(ModelParams::RandomForest {
                            n_estimators,
                            max_depth,
                        });
                    }
                }
                grid
            }
            Family::Svm => {
                let mut grid = Vec::new();
                for &c in &[0.1, 1.0, 10.0] {
                    for &kernel in &[Kernel::Linear, Kernel::Rbf] {
                        grid.push(ModelParams::Svm { c, kernel });
                    }
                }
                grid
            }
            Family::GradientBoosting => {
                let mut grid = Vec::new();
                for &n_estimators in &[50usize, 100, 200] {
                    for &learning_rate in &[0.01, 0.1, 0.2] {
                        grid.push(ModelParams::GradientBoosting {
                            n_estimators,
                            learning_rate,
                        });
                    }
                }
                grid
            }
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One point in a family's hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelParams {
    Logistic {
        c: f64,
    },
    NaiveBayes {
        var_smoothing: f64,
    },
    DecisionTree {
        max_depth: Option<usize>,
        min_samples_split: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
    },
    Svm {
        c: f64,
        kernel: Kernel,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
    },
}

impl ModelParams {
    pub fn family(&self) -> Family {
        match self {
            ModelParams::Logistic { .. } => Family::Logistic,
            ModelParams::NaiveBayes { .. } => Family::NaiveBayes,
            ModelParams::DecisionTree { .. } => Family::DecisionTree,
            ModelParams::RandomForest { .. } => Family::RandomForest,
            ModelParams::Svm { .. } => Family::Svm,
            ModelParams::GradientBoosting { .. } => Family::GradientBoosting,
        }
    }

    /// Construct an unfitted classifier for this grid point.
    pub fn build(&self) -> Classifier {
        match *self {
            ModelParams::Logistic { c } => Classifier::Logistic(LogisticRegression::new(c)),
            ModelParams::NaiveBayes { var_smoothing } => {
                Classifier::NaiveBayes(GaussianNb::new(var_smoothing))
            }
            ModelParams::DecisionTree {
                max_depth,
                min_samples_split,
            } => Classifier::DecisionTree(DecisionTree::classifier(max_depth, min_samples_split)),
            ModelParams::RandomForest {
                n_estimators,
                max_depth,
            } => Classifier::RandomForest(RandomForest::new(n_estimators, max_depth, MODEL_SEED)),
            ModelParams::Svm { c, kernel } => Classifier::Svm(Svc::new(c, kernel, MODEL_SEED)),
            ModelParams::GradientBoosting {
                n_estimators,
                learning_rate,
            } => Classifier::GradientBoosting(GradientBoosting::new(n_estimators, learning_rate)),
        }
    }
}

/// A fitted (or fittable) classifier of any family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Logistic(LogisticRegression),
    NaiveBayes(GaussianNb),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    Svm(Svc),
    GradientBoosting(GradientBoosting),
}

impl Classifier {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::Logistic(m) => m.fit(x, y),
            Classifier::NaiveBayes(m) => m.fit(x, y),
            Classifier::DecisionTree(m) => m.fit(x, y),
            Classifier::RandomForest(m) => m.fit(x, y),
            Classifier::Svm(m) => m.fit(x, y),
            Classifier::GradientBoosting(m) => m.fit(x, y),
        }
    }

    /// Whether the model holds fitted state and can score rows. An SVC with
    /// an empty support set still predicts from its intercept alone, so it
    /// has no structural unfitted marker.
    pub fn is_fitted(&self) -> bool {
        match self {
            Classifier::Logistic(m) => m.is_fitted(),
            Classifier::NaiveBayes(m) => m.is_fitted(),
            Classifier::DecisionTree(m) => m.is_fitted(),
            Classifier::RandomForest(m) => m.is_fitted(),
            Classifier::Svm(_) => true,
            Classifier::GradientBoosting(m) => m.is_fitted(),
        }
    }

    /// Probability of the positive (active) class per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            Classifier::Logistic(m) => m.predict_proba(x),
            Classifier::NaiveBayes(m) => m.predict_proba(x),
            Classifier::DecisionTree(m) => m.predict(x),
            Classifier::RandomForest(m) => m.predict_proba(x),
            Classifier::Svm(m) => m.predict_proba(x),
            Classifier::GradientBoosting(m) => m.predict_proba(x),
        }
    }

    /// Hard labels at the 0.5 threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x)
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_family_ids_round_trip() {
        for family in Family::ALL {
            assert_eq!(Family::from_id(family.id()), Some(family));
        }
        assert_eq!(Family::from_id("nope"), None);
    }

    #[test]
    fn test_grid_sizes_match_registry() {
        assert_eq!(Family::Logistic.grid().len(), 3);
        assert_eq!(Family::NaiveBayes.grid().len(), 4);
        assert_eq!(Family::DecisionTree.grid().len(), 9);
        assert_eq!(Family::RandomForest.grid().len(), 9);
        assert_eq!(Family::Svm.grid().len(), 6);
        assert_eq!(Family::GradientBoosting.grid().len(), 9);
    }

    #[test]
    fn test_every_family_fits_and_scores() {
        let x = arr2(&[
            [0.1, 0.9],
            [0.2, 0.8],
            [0.1, 0.7],
            [0.9, 0.1],
            [0.8, 0.2],
            [0.9, 0.3],
        ]);
        let y = arr1(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        for family in Family::ALL {
            let params = family.grid()[0];
            let mut model = params.build();
            model.fit(&x, &y).unwrap();
            let probs = model.predict_proba(&x);
            assert_eq!(probs.len(), 6);
            for p in probs {
                assert!((0.0..=1.0).contains(&p), "{family} produced {p}");
            }
        }
    }

    #[test]
    fn test_classifier_survives_json_round_trip() {
        let x = arr2(&[[0.0], [0.2], [0.8], [1.0]]);
        let y = arr1(&[0.0, 0.0, 1.0, 1.0]);
        let params = ModelParams::Logistic { c: 1.0 };
        let mut model = params.build();
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: Classifier = serde_json::from_str(&json).unwrap();
        assert_eq!(model.predict_proba(&x), restored.predict_proba(&x));
    }
}
