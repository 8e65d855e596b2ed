//! cribrum — virtual-screening model builder and predictor.
//!
//! `create-model` runs the full table-fusion → filtering → reduction →
//! training pipeline over four raw exports and persists the resulting
//! models, scaler, metrics and run provenance. `predict` scores a new
//! compound table against every persisted model and reports a consensus.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cribrum_common::Table;
use cribrum_data::filter::pretreat;
use cribrum_data::fusion::{fuse, FusionInputs};
use cribrum_data::reduce::normalize;
use cribrum_ml::artifacts::{
    self, discover_models, load_by_prefix, load_scaler, run_timestamp, save_scaler,
    write_metrics_csv, RunConfig,
};
use cribrum_ml::train::train_all;

#[derive(Parser)]
#[command(name = "cribrum", version, about = "Consensus activity models from docking and descriptor exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fuse the four raw exports and train the full model battery.
    CreateModel {
        /// Tab-delimited descriptor export for the active compounds.
        #[arg(long)]
        actives_datawarrior: PathBuf,
        /// Tab-delimited descriptor export for the decoy compounds.
        #[arg(long)]
        decoys_datawarrior: PathBuf,
        /// Comma-delimited docking export for the active compounds.
        #[arg(long)]
        actives_consolidated: PathBuf,
        /// Comma-delimited docking export for the decoy compounds.
        #[arg(long)]
        decoys_consolidated: PathBuf,
        /// Filename prefix shared by every artifact of this run.
        #[arg(long)]
        output: String,
    },
    /// Score a compound table with every model found in the model directory.
    Predict {
        /// CSV with one compound per row and the training-time features.
        #[arg(long)]
        input_data: PathBuf,
        /// Directory scanned for `*_<FAMILY>_model.json` artifacts.
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
        /// Restrict to the models of one training run instead of scanning.
        #[arg(long)]
        model_prefix: Option<String>,
        /// Persisted scaler; omit if the input is already scaled.
        #[arg(long)]
        scaler: Option<PathBuf>,
        /// Output name, written as `output/<NAME>.csv`.
        #[arg(long)]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cribrum=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::CreateModel {
            actives_datawarrior,
            decoys_datawarrior,
            actives_consolidated,
            decoys_consolidated,
            output,
        } => create_model(
            &actives_datawarrior,
            &decoys_datawarrior,
            &actives_consolidated,
            &decoys_consolidated,
            &output,
        ),
        Command::Predict {
            input_data,
            model_dir,
            model_prefix,
            scaler,
            output,
        } => predict(
            &input_data,
            &model_dir,
            model_prefix.as_deref(),
            scaler.as_deref(),
            &output,
        ),
    }
}

fn create_model(
    actives_datawarrior: &Path,
    decoys_datawarrior: &Path,
    actives_consolidated: &Path,
    decoys_consolidated: &Path,
    prefix: &str,
) -> anyhow::Result<()> {
    // Scratch workspace for input copies and stage intermediates; removed
    // on every exit path when the guard drops.
    let scratch = tempfile::TempDir::new().context("creating scratch workspace")?;
    let inputs = FusionInputs {
        actives_descriptor: stage_copy(scratch.path(), actives_datawarrior)?,
        decoys_descriptor: stage_copy(scratch.path(), decoys_datawarrior)?,
        actives_docking: stage_copy(scratch.path(), actives_consolidated)?,
        decoys_docking: stage_copy(scratch.path(), decoys_consolidated)?,
    };

    let fused = fuse(&inputs)?;
    fused.write_path(scratch.path().join("df_final.csv"))?;

    let filtered = pretreat(&fused)?;
    filtered.write_path(scratch.path().join("df_filtered.csv"))?;

    let (reduced, scaler) = normalize(&filtered)?;
    reduced.write_path(scratch.path().join("df_reduced.csv"))?;

    let trained = train_all(&reduced)?;

    let models_dir = Path::new("models");
    let metrics_dir = Path::new("metrics");
    let data_dir = Path::new("data");
    fs::create_dir_all(models_dir)?;
    fs::create_dir_all(metrics_dir)?;
    fs::create_dir_all(data_dir)?;

    for artifact in &trained.artifacts {
        artifact.save(&models_dir.join(artifacts::model_filename(prefix, artifact.family)))?;
    }
    save_scaler(&scaler, &models_dir.join(artifacts::scaler_filename(prefix)))?;
    write_metrics_csv(
        &trained.metrics,
        &metrics_dir.join(artifacts::metrics_filename(prefix)),
    )?;
    trained
        .split
        .save(&data_dir.join(artifacts::split_filename(prefix)))?;

    let config = RunConfig {
        prefix: prefix.to_string(),
        created: run_timestamp(),
        actives_descriptor: actives_datawarrior.to_path_buf(),
        decoys_descriptor: decoys_datawarrior.to_path_buf(),
        actives_docking: actives_consolidated.to_path_buf(),
        decoys_docking: decoys_consolidated.to_path_buf(),
        feature_names: trained.feature_names.clone(),
    };
    config.save(&models_dir.join(artifacts::config_filename(prefix)))?;

    info!(
        prefix,
        models = trained.artifacts.len(),
        "training run complete"
    );
    Ok(())
}

fn predict(
    input_data: &Path,
    model_dir: &Path,
    model_prefix: Option<&str>,
    scaler_path: Option<&Path>,
    output_name: &str,
) -> anyhow::Result<()> {
    let input = Table::from_path(input_data, b',')?;
    let models = match model_prefix {
        Some(prefix) => load_by_prefix(model_dir, prefix)?,
        None => discover_models(model_dir)?,
    };
    let scaler = scaler_path.map(load_scaler).transpose()?;

    let predictions = cribrum_ml::predict::predict(&input, &models, scaler.as_ref())?;

    let output_dir = Path::new("output");
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.csv", output_name));
    predictions.write_path(&path)?;

    info!(path = %path.display(), compounds = predictions.n_rows(), "predictions written");
    Ok(())
}

/// Copy one input into the scratch workspace, keeping its filename.
fn stage_copy(scratch: &Path, source: &Path) -> anyhow::Result<PathBuf> {
    let name = source
        .file_name()
        .with_context(|| format!("input path {:?} has no filename", source))?;
    let dest = scratch.join(name);
    fs::copy(source, &dest).with_context(|| format!("copying {:?} into workspace", source))?;
    Ok(dest)
}
