//! Stage 1 — fuse descriptor-tool and docking-tool exports.
//!
//! The two tools export the same compounds in the same order (actives first,
//! then decoys), so the join is positional. The normalised identifier columns
//! are compared row-for-row as an integrity gate before the tables are glued
//! together; a mismatch means the exports were produced from different runs
//! and the whole stage aborts.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use cribrum_common::ident::{ligand_from_entry, normalize_compound_id};
use cribrum_common::{CribrumError, Result, Table, ID_COLUMN, LABEL_COLUMN};

/// Descriptor-export columns with no predictive value (structure encodings
/// and the spreadsheet artifact column).
const DESCRIPTOR_DROP: &[&str] = &["Structure of smiles [idcode]", "smiles", "Unnamed: 16"];

/// Bookkeeping columns from the docking export, dropped after fusion.
const POST_FUSION_DROP: &[&str] = &["Index", "Rescore.Rmsd", "Version"];

/// Identifier column as the docking tool names it.
const DOCKING_ENTRY_COLUMN: &str = "Entry";

/// How many identifier mismatches to show in the error message.
const MISMATCH_PREVIEW: usize = 5;

/// The four input exports, actives and decoys per tool.
#[derive(Debug, Clone)]
pub struct FusionInputs {
    pub actives_descriptor: PathBuf,
    pub decoys_descriptor: PathBuf,
    pub actives_docking: PathBuf,
    pub decoys_docking: PathBuf,
}

/// Load, clean and fuse the four exports into one labelled feature table.
///
/// The output carries the descriptor columns, then the docking columns
/// (minus its duplicate identifier), with `activity` as the trailing column.
pub fn fuse(inputs: &FusionInputs) -> Result<Table> {
    let descriptor = load_descriptor_source(&inputs.actives_descriptor, &inputs.decoys_descriptor)?;
    let docking = load_docking_source(&inputs.actives_docking, &inputs.decoys_docking)?;

    check_identifier_alignment(&descriptor, &docking)?;

    // The docking side keeps all columns except its own identifier, which
    // would duplicate the descriptor side's.
    let mut docking = docking;
    docking.remove_column(ID_COLUMN)?;

    let mut fused = descriptor.hstack(&docking)?;

    // Label goes last regardless of where the docking export put it.
    let labels = fused.remove_column(LABEL_COLUMN)?;
    fused.push_column(LABEL_COLUMN, labels)?;

    fused.drop_columns(POST_FUSION_DROP);

    info!(
        rows = fused.n_rows(),
        cols = fused.n_cols(),
        "fused descriptor and docking exports"
    );
    Ok(fused)
}

/// Tab-delimited descriptor exports: clean both, stack actives over decoys.
fn load_descriptor_source(actives: &Path, decoys: &Path) -> Result<Table> {
    let mut actives = Table::from_path(actives, b'\t')?;
    actives.drop_columns(DESCRIPTOR_DROP);
    let mut decoys = Table::from_path(decoys, b'\t')?;
    decoys.drop_columns(DESCRIPTOR_DROP);

    let mut combined = actives.vstack(&decoys);
    combined.map_column(ID_COLUMN, |v| normalize_compound_id(v))?;
    debug!(rows = combined.n_rows(), "loaded descriptor source");
    Ok(combined)
}

/// Comma-delimited docking exports: label by provenance (actives file → 1,
/// decoys file → 0), stack, normalise the identifier.
fn load_docking_source(actives: &Path, decoys: &Path) -> Result<Table> {
    let mut actives = Table::from_path(actives, b',')?;
    actives.push_column(LABEL_COLUMN, vec!["1".to_string(); actives.n_rows()])?;
    let mut decoys = Table::from_path(decoys, b',')?;
    decoys.push_column(LABEL_COLUMN, vec!["0".to_string(); decoys.n_rows()])?;

    let mut combined = actives.vstack(&decoys);
    combined.rename_column(DOCKING_ENTRY_COLUMN, ID_COLUMN)?;
    combined.map_column(ID_COLUMN, |v| {
        normalize_compound_id(ligand_from_entry(v))
    })?;
    debug!(rows = combined.n_rows(), "loaded docking source");
    Ok(combined)
}

/// Hard precondition: after normalisation the identifier columns must agree
/// element-for-element. No realignment is attempted.
fn check_identifier_alignment(descriptor: &Table, docking: &Table) -> Result<()> {
    if descriptor.n_rows() != docking.n_rows() {
        return Err(CribrumError::Integrity(format!(
            "descriptor source has {} rows but docking source has {}",
            descriptor.n_rows(),
            docking.n_rows()
        )));
    }

    let descriptor_ids = descriptor.column(ID_COLUMN)?;
    let docking_ids = docking.column(ID_COLUMN)?;

    let mismatches: Vec<String> = descriptor_ids
        .iter()
        .zip(&docking_ids)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .take(MISMATCH_PREVIEW)
        .map(|(i, (a, b))| format!("row {}: '{}' vs '{}'", i, a, b))
        .collect();

    if !mismatches.is_empty() {
        return Err(CribrumError::Integrity(format!(
            "identifier mismatch between descriptor and docking sources: {}",
            mismatches.join("; ")
        )));
    }
    Ok(())
}
