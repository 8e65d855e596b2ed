//! cribrum-ml — Training, evaluation and prediction for the activity models.
//!
//! Six classifier families are trained per run, each tuned by grid search
//! over a small fixed hyperparameter grid with stratified cross-validation.
//! Trained models are persisted as JSON artifacts together with the ordered
//! feature-name list they were fitted on; the prediction path rebuilds the
//! feature matrix from that list and derives a consensus vote across all
//! loadable models.

pub mod artifacts;
pub mod dataset;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod predict;
pub mod smote;
pub mod split;
pub mod train;

pub use artifacts::TrainedArtifact;
pub use models::{Classifier, Family, ModelParams};
