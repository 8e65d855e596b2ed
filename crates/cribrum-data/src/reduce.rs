//! Stage 3 — normalisation and decorrelation.
//!
//! Scales every feature to [0, 1], then removes the later column of every
//! pair whose Pearson correlation exceeds the cutoff. Removal decisions are
//! taken against the pre-drop correlation matrix in one pass over the
//! original column order; the greedy rule is order-dependent and not a
//! minimum-removal solution, and is kept bit-for-bit for compatibility with
//! models trained by earlier versions of the pipeline.

use serde::{Deserialize, Serialize};
use tracing::info;

use cribrum_common::{CribrumError, Result, Table, ID_COLUMN, LABEL_COLUMN};

/// Pairwise |Pearson r| above this marks the later column for removal.
const CORRELATION_CUTOFF: f64 = 0.5;

/// Fitted min-max transform over the feature columns seen at reduction time.
///
/// Persisted alongside the models so inference can reproduce the exact
/// training-time scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub feature_names: Vec<String>,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit over column-major data.
    pub fn fit(names: &[String], columns: &[Vec<f64>]) -> Self {
        let mins = columns
            .iter()
            .map(|c| c.iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        let maxs = columns
            .iter()
            .map(|c| c.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect();
        Self {
            feature_names: names.to_vec(),
            mins,
            maxs,
        }
    }

    /// Scale one value of the feature at `index`. Constant columns map to 0.
    pub fn transform_value(&self, index: usize, value: f64) -> f64 {
        let range = self.maxs[index] - self.mins[index];
        if range.abs() < f64::EPSILON {
            0.0
        } else {
            (value - self.mins[index]) / range
        }
    }

    /// Scale a row-major matrix whose columns are named by `names`.
    ///
    /// Fails if any named column was not seen when the scaler was fitted.
    pub fn transform_named(
        &self,
        data: &mut ndarray::Array2<f64>,
        names: &[String],
    ) -> Result<()> {
        let indices: Vec<usize> = names
            .iter()
            .map(|n| {
                self.feature_names
                    .iter()
                    .position(|f| f == n)
                    .ok_or_else(|| {
                        CribrumError::Config(format!(
                            "feature '{}' was not seen by the persisted scaler",
                            n
                        ))
                    })
            })
            .collect::<Result<_>>()?;

        for (col, &scaler_idx) in indices.iter().enumerate() {
            for row in 0..data.nrows() {
                data[[row, col]] = self.transform_value(scaler_idx, data[[row, col]]);
            }
        }
        Ok(())
    }
}

/// Scale features to [0, 1] and drop correlated columns.
///
/// The identifier column is consumed here: downstream training operates on
/// features + label only. Returns the reduced table and the fitted scaler.
pub fn normalize(table: &Table) -> Result<(Table, MinMaxScaler)> {
    let mut table = table.clone();
    table.remove_column(ID_COLUMN)?;
    let labels = table.remove_column(LABEL_COLUMN)?;

    let names: Vec<String> = table.headers().to_vec();
    let n_rows = table.n_rows();
    let columns: Vec<Vec<f64>> = (0..names.len())
        .map(|c| {
            table
                .rows()
                .iter()
                .map(|row| row[c].trim().parse::<f64>().unwrap_or(0.0))
                .collect()
        })
        .collect();

    let scaler = MinMaxScaler::fit(&names, &columns);
    let scaled: Vec<Vec<f64>> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| col.iter().map(|&v| scaler.transform_value(i, v)).collect())
        .collect();

    // One-pass greedy marking against the full pre-drop correlation matrix:
    // for every over-threshold pair the later column goes.
    let p = scaled.len();
    let mut marked = vec![false; p];
    for i in 0..p {
        for j in 0..i {
            if pearson(&scaled[i], &scaled[j]).abs() > CORRELATION_CUTOFF {
                marked[i] = true;
                break;
            }
        }
    }

    let kept: Vec<usize> = (0..p).filter(|&i| !marked[i]).collect();
    info!(
        kept = kept.len(),
        dropped = p - kept.len(),
        "correlation reduction applied"
    );

    let mut out = Table::new(kept.iter().map(|&i| names[i].clone()).collect());
    for r in 0..n_rows {
        out.push_row(kept.iter().map(|&i| scaled[i][r].to_string()).collect());
    }
    out.push_column(LABEL_COLUMN, labels)?;
    Ok((out, scaler))
}

/// Pearson correlation of two equal-length columns; 0 when either side is
/// constant (matches treating NaN correlations as uncorrelated).
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_table(cols: &[(&str, &[f64])]) -> Table {
        let n = cols[0].1.len();
        let mut t = Table::new(vec![ID_COLUMN.to_string()]);
        for i in 0..n {
            t.push_row(vec![format!("M{}", i)]);
        }
        for (name, values) in cols {
            t.push_column(name, values.iter().map(|v| v.to_string()).collect())
                .unwrap();
        }
        t.push_column(LABEL_COLUMN, (0..n).map(|i| format!("{}", i % 2)).collect())
            .unwrap();
        t
    }

    #[test]
    fn test_scaled_values_in_unit_range() {
        let t = feature_table(&[("x", &[10.0, 30.0, 20.0, 40.0])]);
        let (reduced, _) = normalize(&t).unwrap();
        for v in reduced.column("x").unwrap() {
            let v: f64 = v.parse().unwrap();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_later_correlated_column_dropped() {
        // y = 2x is perfectly correlated; z is independent of both.
        let t = feature_table(&[
            ("x", &[1.0, 2.0, 3.0, 4.0]),
            ("y", &[2.0, 4.0, 6.0, 8.0]),
            ("z", &[5.0, 1.0, 4.0, 1.5]),
        ]);
        let (reduced, _) = normalize(&t).unwrap();
        assert!(reduced.column_index("x").is_some());
        assert!(reduced.column_index("y").is_none());
        assert!(reduced.column_index("z").is_some());
    }

    #[test]
    fn test_no_retained_pair_exceeds_cutoff() {
        let t = feature_table(&[
            ("a", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b", &[1.1, 2.2, 2.9, 4.1, 5.2]),
            ("c", &[9.0, 1.0, 7.0, 2.0, 8.0]),
        ]);
        let (reduced, _) = normalize(&t).unwrap();
        let mut kept: Vec<Vec<f64>> = Vec::new();
        for name in reduced.headers() {
            if name == LABEL_COLUMN {
                continue;
            }
            kept.push(
                reduced
                    .column(name)
                    .unwrap()
                    .iter()
                    .map(|v| v.parse().unwrap())
                    .collect(),
            );
        }
        for i in 0..kept.len() {
            for j in 0..i {
                assert!(pearson(&kept[i], &kept[j]).abs() <= CORRELATION_CUTOFF);
            }
        }
    }

    #[test]
    fn test_scaler_round_trip_on_named_matrix() {
        let t = feature_table(&[("x", &[0.0, 5.0, 10.0, 2.5]), ("w", &[1.0, 3.0, 2.0, 0.0])]);
        let (_, scaler) = normalize(&t).unwrap();

        let mut m = ndarray::arr2(&[[10.0, 1.0], [0.0, 3.0]]);
        // Columns supplied in swapped order relative to the scaler.
        scaler
            .transform_named(&mut m, &["x".to_string(), "w".to_string()])
            .unwrap();
        assert!((m[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((m[[1, 0]] - 0.0).abs() < 1e-12);

        let err = scaler.transform_named(&mut m, &["unknown".to_string()]);
        assert!(err.is_err());
    }
}
