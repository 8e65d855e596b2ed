//! Conversion between the reduced feature table and ndarray matrices.

use ndarray::{Array1, Array2};

use cribrum_common::{CribrumError, Result, Table, LABEL_COLUMN};

/// Split a reduced table (features + trailing label) into a row-major
/// feature matrix, the label vector, and the ordered feature names.
pub fn features_and_labels(table: &Table) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let label_idx = table.column_index(LABEL_COLUMN).ok_or_else(|| {
        CribrumError::Pipeline(format!("training table has no '{}' column", LABEL_COLUMN))
    })?;

    let feature_names: Vec<String> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != label_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let x = matrix_from_columns(table, &feature_names)?;
    let y = Array1::from_iter(
        table
            .rows()
            .iter()
            .map(|row| row[label_idx].trim().parse::<f64>().unwrap_or(0.0)),
    );
    Ok((x, y, feature_names))
}

/// Build a row-major matrix from the named columns, in the given order.
///
/// Fails on the first missing column; unparseable cells are zero-filled,
/// consistent with the pre-treatment policy.
pub fn matrix_from_columns(table: &Table, names: &[String]) -> Result<Array2<f64>> {
    let indices: Vec<usize> = names
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| {
                CribrumError::Integrity(format!(
                    "required column '{}' not found in input data",
                    name
                ))
            })
        })
        .collect::<Result<_>>()?;

    let rows = table.rows();
    Ok(Array2::from_shape_fn((rows.len(), indices.len()), |(r, c)| {
        rows[r][indices[c]].trim().parse::<f64>().unwrap_or(0.0)
    }))
}
