//! Training orchestration: balance, split, search, evaluate.

use ndarray::{Array1, Array2};
use tracing::info;

use cribrum_common::{Result, Table};

use crate::artifacts::{SplitBundle, TrainedArtifact};
use crate::dataset::features_and_labels;
use crate::grid::grid_search;
use crate::metrics::{evaluate, MetricsRow};
use crate::models::{Family, MODEL_SEED};
use crate::smote::{self, DEFAULT_K};
use crate::split::train_test_split;

/// Fraction of rows held out for the test split.
pub const TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub artifacts: Vec<TrainedArtifact>,
    pub metrics: Vec<MetricsRow>,
    pub split: SplitBundle,
    pub feature_names: Vec<String>,
}

/// Train all six families on a reduced feature table.
///
/// The class balance is equalised first, then a seeded 80/20 split feeds
/// every family's grid search, so all models see the same partition. Any
/// family that fails to train aborts the run.
pub fn train_all(reduced: &Table) -> Result<TrainOutput> {
    let (x, y, feature_names) = features_and_labels(reduced)?;
    info!(
        rows = x.nrows(),
        features = x.ncols(),
        "starting training run"
    );

    let (x_bal, y_bal) = smote::resample(&x, &y, DEFAULT_K, MODEL_SEED)?;
    let split = train_test_split(&x_bal, &y_bal, TEST_FRACTION, MODEL_SEED)?;

    let mut artifacts = Vec::with_capacity(Family::ALL.len());
    let mut metrics = Vec::with_capacity(2 * Family::ALL.len());

    for family in Family::ALL {
        let result = grid_search(family, &split.x_train, &split.y_train)?;
        metrics.push(score_split(
            family,
            "train",
            &result.model,
            &split.x_train,
            &split.y_train,
        ));
        metrics.push(score_split(
            family,
            "test",
            &result.model,
            &split.x_test,
            &split.y_test,
        ));
        artifacts.push(TrainedArtifact {
            family,
            feature_names: feature_names.clone(),
            params: result.params,
            model: result.model,
        });
    }

    Ok(TrainOutput {
        artifacts,
        metrics,
        split: SplitBundle {
            x_train: split.x_train,
            x_test: split.x_test,
            y_train: split.y_train,
            y_test: split.y_test,
        },
        feature_names,
    })
}

fn score_split(
    family: Family,
    split: &str,
    model: &crate::models::Classifier,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> MetricsRow {
    let probs = model.predict_proba(x).to_vec();
    let preds: Vec<f64> = probs
        .iter()
        .map(|&p| if p > 0.5 { 1.0 } else { 0.0 })
        .collect();
    evaluate(family.id(), split, &y.to_vec(), &preds, &probs)
}
