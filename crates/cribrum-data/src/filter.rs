//! Stage 2 — pre-treatment filtering.
//!
//! Coerces every descriptor column to numeric and prunes degenerate columns:
//! mostly-zero columns carry no signal, near-constant columns carry none
//! either. Coercion failures are zero-filled, not dropped; this is the named
//! `zero-fill` policy inherited from the upstream exports, which pad missing
//! descriptors with blanks.

use tracing::{debug, info};

use cribrum_common::{Result, Table, ID_COLUMN, LABEL_COLUMN};

/// Columns with a zero-fraction above this are dropped.
const MAX_ZERO_FRACTION: f64 = 0.5;

/// Columns with sample variance below this are dropped. Computed before
/// scaling, so columns with large natural ranges are effectively exempt.
const MIN_VARIANCE: f64 = 0.01;

/// Apply the pre-treatment filter to a fused table.
///
/// The identifier column is reattached as the leading column and the label
/// as the trailing column; everything between is numeric.
pub fn pretreat(table: &Table) -> Result<Table> {
    let mut table = table.clone();
    let ids = table.remove_column(ID_COLUMN)?;
    let labels = table.remove_column(LABEL_COLUMN)?;

    let n_rows = table.n_rows();
    let names: Vec<String> = table.headers().to_vec();

    // Column-major numeric view, zero-filling anything unparseable.
    let mut zero_filled = 0usize;
    let columns: Vec<Vec<f64>> = (0..names.len())
        .map(|c| {
            table
                .rows()
                .iter()
                .map(|row| match row[c].trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        zero_filled += 1;
                        0.0
                    }
                })
                .collect()
        })
        .collect();
    if zero_filled > 0 {
        debug!(cells = zero_filled, "zero-filled non-numeric cells");
    }

    let mut kept_names = Vec::new();
    let mut kept_columns = Vec::new();
    let mut dropped_zeros = 0usize;
    let mut dropped_variance = 0usize;

    for (name, column) in names.into_iter().zip(columns) {
        let zero_count = column.iter().filter(|v| **v == 0.0).count();
        if zero_count as f64 > MAX_ZERO_FRACTION * n_rows as f64 {
            dropped_zeros += 1;
            continue;
        }
        if sample_variance(&column) < MIN_VARIANCE {
            dropped_variance += 1;
            continue;
        }
        kept_names.push(name);
        kept_columns.push(column);
    }

    info!(
        kept = kept_names.len(),
        dropped_zeros, dropped_variance, "pre-treatment filter applied"
    );

    let mut out = Table::new(kept_names);
    for r in 0..n_rows {
        out.push_row(kept_columns.iter().map(|col| format_cell(col[r])).collect());
    }
    out.insert_column(0, ID_COLUMN, ids)?;
    out.push_column(LABEL_COLUMN, labels)?;
    Ok(out)
}

/// Unbiased (n−1) variance; 0 for columns with fewer than two rows.
fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

fn format_cell(v: f64) -> String {
    // Integral values print without a trailing ".0" so the output matches
    // the incoming export style.
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled_table(cols: &[(&str, &[&str])]) -> Table {
        let n = cols[0].1.len();
        let mut t = Table::new(vec![ID_COLUMN.to_string()]);
        for i in 0..n {
            t.push_row(vec![format!("M{}", i)]);
        }
        for (name, values) in cols {
            t.push_column(name, values.iter().map(|s| s.to_string()).collect())
                .unwrap();
        }
        t.push_column(LABEL_COLUMN, (0..n).map(|i| format!("{}", i % 2)).collect())
            .unwrap();
        t
    }

    #[test]
    fn test_mostly_zero_column_dropped() {
        let t = labelled_table(&[
            ("sparse", &["0", "0", "0", "5.0"]),
            ("dense", &["1.1", "2.3", "3.1", "4.9"]),
        ]);
        let filtered = pretreat(&t).unwrap();
        assert!(filtered.column_index("sparse").is_none());
        assert!(filtered.column_index("dense").is_some());
    }

    #[test]
    fn test_low_variance_column_dropped() {
        let t = labelled_table(&[
            ("flat", &["3.0", "3.001", "3.002", "3.0"]),
            ("varied", &["1.0", "5.0", "9.0", "2.0"]),
        ]);
        let filtered = pretreat(&t).unwrap();
        assert!(filtered.column_index("flat").is_none());
        assert!(filtered.column_index("varied").is_some());
    }

    #[test]
    fn test_non_numeric_cells_zero_filled() {
        // "n/a" coerces to 0, tipping the column over the 50% zero limit.
        let t = labelled_table(&[
            ("broken", &["n/a", "n/a", "n/a", "2.0"]),
            ("clean", &["1.0", "2.0", "3.0", "4.0"]),
        ]);
        let filtered = pretreat(&t).unwrap();
        assert!(filtered.column_index("broken").is_none());
        assert!(filtered.column_index("clean").is_some());
    }

    #[test]
    fn test_identifier_leads_and_label_trails() {
        let t = labelled_table(&[("x", &["1.0", "2.0", "3.0", "4.0"])]);
        let filtered = pretreat(&t).unwrap();
        assert_eq!(filtered.headers().first().unwrap(), ID_COLUMN);
        assert_eq!(filtered.headers().last().unwrap(), LABEL_COLUMN);
    }
}
