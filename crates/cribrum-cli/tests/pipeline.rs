//! End-to-end pipeline test: four raw exports in, models and predictions out.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cribrum"))
}

/// Minimal but realistic exports: two actives and two decoys per source,
/// five shared numeric descriptors, aligned identifiers.
fn write_exports(dir: &Path) {
    fs::write(
        dir.join("actives_dw.txt"),
        "name\tsmiles\tMolweight\tcLogP\tTPSA\tH-Donors\n\
         Resultados/lig1.pdb\tCCO\t412.3\t3.1\t88.2\t2\n\
         Resultados/lig2.pdb\tCCN\t398.7\t2.8\t91.5\t3\n",
    )
    .unwrap();
    fs::write(
        dir.join("decoys_dw.txt"),
        "name\tsmiles\tMolweight\tcLogP\tTPSA\tH-Donors\n\
         Resultados/dec1.pdb\tCCC\t210.4\t1.2\t34.7\t1\n\
         Resultados/dec2.pdb\tCOC\t195.8\t1.5\t29.3\t1\n",
    )
    .unwrap();
    fs::write(
        dir.join("actives_cons.csv"),
        "Entry,Score,Rescore.Rmsd\n\
         pose1|lig1|r1,58.4,0.3\n\
         pose2|lig2|r1,61.2,0.5\n",
    )
    .unwrap();
    fs::write(
        dir.join("decoys_cons.csv"),
        "Entry,Score,Rescore.Rmsd\n\
         pose7|dec1|r1,22.9,0.8\n\
         pose8|dec2|r1,19.4,0.6\n",
    )
    .unwrap();
}

fn run_create_model(workspace: &Path) {
    cli()
        .current_dir(workspace)
        .args([
            "create-model",
            "--actives-datawarrior",
            "actives_dw.txt",
            "--decoys-datawarrior",
            "decoys_dw.txt",
            "--actives-consolidated",
            "actives_cons.csv",
            "--decoys-consolidated",
            "decoys_cons.csv",
            "--output",
            "run",
        ])
        .assert()
        .success();
}

#[test]
fn test_create_model_persists_all_artifacts() {
    let workspace = TempDir::new().unwrap();
    write_exports(workspace.path());
    run_create_model(workspace.path());

    let models = workspace.path().join("models");
    for family in ["LR", "NB", "DT", "RF", "SVM", "GBT"] {
        assert!(
            models.join(format!("run_{}_model.json", family)).exists(),
            "missing {} artifact",
            family
        );
    }
    assert!(models.join("run_scaler.json").exists());
    assert!(models.join("run_config.json").exists());
    assert!(workspace
        .path()
        .join("data/run_train_test_data.json")
        .exists());

    let metrics = fs::read_to_string(workspace.path().join("metrics/run_metrics.csv")).unwrap();
    let mut lines = metrics.lines();
    assert!(lines.next().unwrap().starts_with("Model,Split,"));
    assert_eq!(lines.count(), 12, "expected one row per family and split");
}

#[test]
fn test_predict_scores_with_consensus() {
    let workspace = TempDir::new().unwrap();
    write_exports(workspace.path());
    run_create_model(workspace.path());

    fs::write(
        workspace.path().join("screen.csv"),
        "NAME,Molweight,cLogP,TPSA,H-Donors,Score\n\
         ZINC001,405.0,3.0,89.0,2,59.5\n\
         ZINC002,201.2,1.3,31.0,1,21.0\n",
    )
    .unwrap();

    cli()
        .current_dir(workspace.path())
        .args([
            "predict",
            "--input-data",
            "screen.csv",
            "--scaler",
            "models/run_scaler.json",
            "--output",
            "screened",
        ])
        .assert()
        .success();

    let out = fs::read_to_string(workspace.path().join("output/screened.csv")).unwrap();
    let mut lines = out.lines();
    let header = lines.next().unwrap();
    assert_eq!(
        header,
        "name,prob_LR,prob_NB,prob_DT,prob_RF,prob_SVM,prob_GBT,consensus,consensus_models"
    );

    for line in lines {
        let cells: Vec<&str> = line.split(',').collect();
        assert!(cells[0].starts_with("ZINC"));
        for prob in &cells[1..7] {
            let p: f64 = prob.parse().unwrap();
            assert!((0.0..=1.0).contains(&p), "probability {} out of range", p);
        }
        let consensus: usize = cells[7].parse().unwrap();
        assert!(consensus <= 6);
    }
}

#[test]
fn test_misaligned_exports_abort_before_output() {
    let workspace = TempDir::new().unwrap();
    write_exports(workspace.path());
    // Docking decoys reference a ligand the descriptor export never saw.
    fs::write(
        workspace.path().join("decoys_cons.csv"),
        "Entry,Score,Rescore.Rmsd\n\
         pose7|other|r1,22.9,0.8\n\
         pose8|dec2|r1,19.4,0.6\n",
    )
    .unwrap();

    cli()
        .current_dir(workspace.path())
        .args([
            "create-model",
            "--actives-datawarrior",
            "actives_dw.txt",
            "--decoys-datawarrior",
            "decoys_dw.txt",
            "--actives-consolidated",
            "actives_cons.csv",
            "--decoys-consolidated",
            "decoys_cons.csv",
            "--output",
            "run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("identifier mismatch"));

    assert!(!workspace.path().join("models").exists());
}

#[test]
fn test_predict_without_models_fails() {
    let workspace = TempDir::new().unwrap();
    fs::write(workspace.path().join("screen.csv"), "NAME,f1\nZINC001,0.5\n").unwrap();
    fs::create_dir(workspace.path().join("models")).unwrap();

    cli()
        .current_dir(workspace.path())
        .args([
            "predict",
            "--input-data",
            "screen.csv",
            "--output",
            "screened",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no model artifacts"));
}
