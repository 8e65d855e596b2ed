//! Persistence of trained models and their companion run artifacts.
//!
//! Everything is JSON apart from the metrics table, which is CSV. Artifacts
//! share a run prefix so one directory can hold several runs side by side:
//! `<prefix>_<FAMILY>_model.json`, `<prefix>_scaler.json`,
//! `<prefix>_config.json`, `<prefix>_train_test_data.json` and
//! `<prefix>_metrics.csv`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ndarray::{Array1, Array2};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cribrum_common::{CribrumError, Result};
use cribrum_data::reduce::MinMaxScaler;

use crate::metrics::MetricsRow;
use crate::models::{Classifier, Family, ModelParams};

/// A fitted model bundled with everything needed to score new data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub family: Family,
    /// Feature column order the model was fitted on.
    pub feature_names: Vec<String>,
    pub params: ModelParams,
    pub model: Classifier,
}

impl TrainedArtifact {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Load and validate. A file that deserializes but holds an unfitted
    /// model (e.g. a tree with no root) is rejected here, before it can
    /// panic at scoring time.
    pub fn load(path: &Path) -> Result<TrainedArtifact> {
        let artifact: TrainedArtifact = read_json(path)?;
        if !artifact.model.is_fitted() {
            return Err(CribrumError::Integrity(format!(
                "model artifact {:?} holds an unfitted {} model",
                path, artifact.family
            )));
        }
        Ok(artifact)
    }
}

/// Provenance of a training run, stored next to its models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub prefix: String,
    pub created: String,
    pub actives_descriptor: PathBuf,
    pub decoys_descriptor: PathBuf,
    pub actives_docking: PathBuf,
    pub decoys_docking: PathBuf,
    pub feature_names: Vec<String>,
}

impl RunConfig {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<RunConfig> {
        read_json(path)
    }
}

/// The exact train/test partition used by a run, for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitBundle {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl SplitBundle {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<SplitBundle> {
        read_json(path)
    }
}

/// Creation timestamp stored in the run config.
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn model_filename(prefix: &str, family: Family) -> String {
    format!("{}_{}_model.json", prefix, family.id())
}

pub fn scaler_filename(prefix: &str) -> String {
    format!("{}_scaler.json", prefix)
}

pub fn config_filename(prefix: &str) -> String {
    format!("{}_config.json", prefix)
}

pub fn metrics_filename(prefix: &str) -> String {
    format!("{}_metrics.csv", prefix)
}

pub fn split_filename(prefix: &str) -> String {
    format!("{}_train_test_data.json", prefix)
}

pub fn save_scaler(scaler: &MinMaxScaler, path: &Path) -> Result<()> {
    write_json(path, scaler)
}

pub fn load_scaler(path: &Path) -> Result<MinMaxScaler> {
    read_json(path)
}

pub fn write_metrics_csv(rows: &[MetricsRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Scan a directory for model artifacts, keeping the first readable one per
/// family. Unreadable candidates are skipped with a warning rather than
/// aborting the scan.
pub fn discover_models(dir: &Path) -> Result<Vec<TrainedArtifact>> {
    static MODEL_FILE: OnceLock<Regex> = OnceLock::new();
    let pattern = MODEL_FILE
        .get_or_init(|| Regex::new(r"_([A-Za-z0-9]+)_model\.json$").expect("valid model pattern"));

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| {
            CribrumError::Config(format!("cannot read model directory {:?}: {}", dir, e))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut by_family: HashMap<Family, TrainedArtifact> = HashMap::new();
    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = pattern.captures(name) else {
            continue;
        };
        let Some(family) = Family::from_id(&captures[1]) else {
            warn!(file = name, "skipping model file with unknown family id");
            continue;
        };
        if by_family.contains_key(&family) {
            continue;
        }
        match TrainedArtifact::load(&path) {
            Ok(artifact) if artifact.family == family => {
                info!(file = name, family = %family, "loaded model");
                by_family.insert(family, artifact);
            }
            Ok(artifact) => {
                warn!(
                    file = name,
                    named = %family,
                    stored = %artifact.family,
                    "skipping model whose filename disagrees with its contents"
                );
            }
            Err(e) => {
                warn!(file = name, error = %e, "skipping unreadable model file");
            }
        }
    }

    if by_family.is_empty() {
        return Err(CribrumError::Config(format!(
            "no model artifacts found in {:?}",
            dir
        )));
    }

    // Stable family order regardless of filesystem ordering.
    Ok(Family::ALL
        .iter()
        .filter_map(|f| by_family.remove(f))
        .collect())
}

/// Load models saved under an exact run prefix, one per family where the
/// file exists. Unlike directory discovery, a present-but-unreadable file
/// is an error here, since the caller asked for that run specifically.
pub fn load_by_prefix(dir: &Path, prefix: &str) -> Result<Vec<TrainedArtifact>> {
    let mut models = Vec::new();
    for family in Family::ALL {
        let path = dir.join(model_filename(prefix, family));
        if path.exists() {
            models.push(TrainedArtifact::load(&path)?);
        }
    }
    if models.is_empty() {
        return Err(CribrumError::Config(format!(
            "no models found with prefix '{}' in {:?}",
            prefix, dir
        )));
    }
    Ok(models)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use tempfile::TempDir;

    fn fitted_artifact(family: Family) -> TrainedArtifact {
        let x = arr2(&[[0.0, 1.0], [0.2, 0.8], [0.8, 0.2], [1.0, 0.0]]);
        let y = arr1(&[0.0, 0.0, 1.0, 1.0]);
        let params = family.grid()[0];
        let mut model = params.build();
        model.fit(&x, &y).unwrap();
        TrainedArtifact {
            family,
            feature_names: vec!["a".into(), "b".into()],
            params,
            model,
        }
    }

    #[test]
    fn test_artifact_round_trip() {
        let dir = TempDir::new().unwrap();
        let artifact = fitted_artifact(Family::Logistic);
        let path = dir.path().join(model_filename("run", Family::Logistic));
        artifact.save(&path).unwrap();

        let restored = TrainedArtifact::load(&path).unwrap();
        assert_eq!(restored.family, Family::Logistic);
        assert_eq!(restored.feature_names, artifact.feature_names);

        let x = arr2(&[[0.1, 0.9], [0.9, 0.1]]);
        assert_eq!(
            artifact.model.predict_proba(&x),
            restored.model.predict_proba(&x)
        );
    }

    #[test]
    fn test_discovery_finds_each_family_once() {
        let dir = TempDir::new().unwrap();
        for family in [Family::Logistic, Family::DecisionTree] {
            fitted_artifact(family)
                .save(&dir.path().join(model_filename("run_a", family)))
                .unwrap();
        }
        // Later prefix for an already-seen family is ignored.
        fitted_artifact(Family::Logistic)
            .save(&dir.path().join(model_filename("run_b", Family::Logistic)))
            .unwrap();
        // Unrelated files are skipped.
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let models = discover_models(dir.path()).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].family, Family::Logistic);
        assert_eq!(models[1].family, Family::DecisionTree);
    }

    #[test]
    fn test_discovery_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        fitted_artifact(Family::Svm)
            .save(&dir.path().join(model_filename("run", Family::Svm)))
            .unwrap();
        fs::write(dir.path().join("run_NB_model.json"), "{ not json").unwrap();

        let models = discover_models(dir.path()).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].family, Family::Svm);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover_models(dir.path()).is_err());
    }

    #[test]
    fn test_unfitted_model_is_rejected_at_load() {
        let dir = TempDir::new().unwrap();
        let params = Family::DecisionTree.grid()[0];
        let artifact = TrainedArtifact {
            family: Family::DecisionTree,
            feature_names: vec!["a".into()],
            params,
            // Built but never fitted: valid JSON, no tree root.
            model: params.build(),
        };
        let path = dir.path().join(model_filename("run", Family::DecisionTree));
        artifact.save(&path).unwrap();

        let err = TrainedArtifact::load(&path).unwrap_err();
        assert!(matches!(err, CribrumError::Integrity(_)));
        // Glob discovery treats it like any other unreadable artifact.
        assert!(discover_models(dir.path()).is_err());
    }

    #[test]
    fn test_load_by_prefix_ignores_other_runs() {
        let dir = TempDir::new().unwrap();
        fitted_artifact(Family::Logistic)
            .save(&dir.path().join(model_filename("run_a", Family::Logistic)))
            .unwrap();
        fitted_artifact(Family::Svm)
            .save(&dir.path().join(model_filename("run_b", Family::Svm)))
            .unwrap();

        let models = load_by_prefix(dir.path(), "run_a").unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].family, Family::Logistic);

        assert!(load_by_prefix(dir.path(), "run_c").is_err());
    }

    #[test]
    fn test_load_by_prefix_propagates_corrupt_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("run_LR_model.json"), "{ not json").unwrap();
        assert!(load_by_prefix(dir.path(), "run").is_err());
    }

    #[test]
    fn test_metrics_csv_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.csv");
        let row = crate::metrics::evaluate(
            "LR",
            "test",
            &[1.0, 0.0],
            &[1.0, 0.0],
            &[0.9, 0.1],
        );
        write_metrics_csv(&[row], &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Model,Split,Recall,Precision,"));
        assert!(text.contains("AUC ROC"));
    }
}
