//! Inference over persisted models with consensus voting.

use ndarray::Array2;
use tracing::{info, warn};

use cribrum_common::{CribrumError, Result, Table};
use cribrum_data::reduce::MinMaxScaler;

use crate::artifacts::TrainedArtifact;
use crate::dataset::matrix_from_columns;

/// Score every compound with every model and attach a consensus verdict.
///
/// The first model's feature list is the reference schema: every model must
/// agree with it, and every feature must exist in the input. The optional
/// scaler reproduces training-time min-max scaling; without one the input
/// is assumed to be pre-scaled.
pub fn predict(
    input: &Table,
    models: &[TrainedArtifact],
    scaler: Option<&MinMaxScaler>,
) -> Result<Table> {
    let reference = models.first().ok_or_else(|| {
        CribrumError::Config("prediction requires at least one model".to_string())
    })?;
    let feature_names = &reference.feature_names;

    for artifact in &models[1..] {
        if &artifact.feature_names != feature_names {
            return Err(CribrumError::Integrity(format!(
                "model {} was trained on a different feature set than model {}",
                artifact.family, reference.family
            )));
        }
    }

    let ids = compound_ids(input);
    let mut x = matrix_from_columns(input, feature_names)?;

    match scaler {
        Some(scaler) => scaler.transform_named(&mut x, feature_names)?,
        None => warn!("no scaler supplied, assuming features are already scaled"),
    }

    info!(
        compounds = x.nrows(),
        models = models.len(),
        "scoring compounds"
    );
    build_output(&ids, &x, models)
}

fn build_output(ids: &[String], x: &Array2<f64>, models: &[TrainedArtifact]) -> Result<Table> {
    let mut headers = vec!["name".to_string()];
    for artifact in models {
        headers.push(format!("prob_{}", artifact.family.id()));
    }
    headers.push("consensus".to_string());
    headers.push("consensus_models".to_string());

    let probabilities: Vec<_> = models
        .iter()
        .map(|a| a.model.predict_proba(x))
        .collect();

    let mut out = Table::new(headers);
    for row in 0..x.nrows() {
        let mut cells = vec![ids[row].clone()];
        let mut agreeing = Vec::new();
        for (artifact, probs) in models.iter().zip(&probabilities) {
            let p = probs[row];
            cells.push(format!("{:.4}", p));
            if p > 0.5 {
                agreeing.push(artifact.family.id());
            }
        }
        cells.push(agreeing.len().to_string());
        cells.push(agreeing.join(", "));
        out.push_row(cells);
    }
    Ok(out)
}

/// Compound identifiers from a NAME/name column, or positional fallbacks.
fn compound_ids(input: &Table) -> Vec<String> {
    let id_idx = input
        .column_index("NAME")
        .or_else(|| input.column_index("name"));
    match id_idx {
        Some(idx) => input.rows().iter().map(|r| r[idx].clone()).collect(),
        None => (0..input.n_rows())
            .map(|i| format!("Compound_{}", i + 1))
            .collect(),
    }
}
