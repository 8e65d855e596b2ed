//! Gaussian naive Bayes with variance smoothing.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use cribrum_common::{CribrumError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNb {
    var_smoothing: f64,
    priors: [f64; 2],
    means: Vec<Array1<f64>>,
    variances: Vec<Array1<f64>>,
}

impl GaussianNb {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            priors: [0.5, 0.5],
            means: Vec::new(),
            variances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        let p = x.ncols();

        let class_rows: Vec<Vec<usize>> = (0..2)
            .map(|class| {
                (0..n)
                    .filter(|&i| (y[i] - class as f64).abs() < 0.5)
                    .collect()
            })
            .collect();

        if class_rows.iter().any(|rows| rows.is_empty()) {
            return Err(CribrumError::Pipeline(
                "naive Bayes requires both classes in the training split".to_string(),
            ));
        }

        // Smoothing floor is relative to the largest feature variance, so it
        // stays meaningful regardless of feature scale.
        let mut max_var = 0.0f64;

        self.means.clear();
        self.variances.clear();
        for rows in &class_rows {
            let m = rows.len() as f64;
            let mut mean = Array1::<f64>::zeros(p);
            for &i in rows {
                mean += &x.row(i);
            }
            mean /= m;

            let mut var = Array1::<f64>::zeros(p);
            for &i in rows {
                let diff = &x.row(i) - &mean;
                var += &diff.mapv(|d| d * d);
            }
            var /= m;

            max_var = max_var.max(var.iter().copied().fold(0.0, f64::max));
            self.means.push(mean);
            self.variances.push(var);
        }

        let floor = self.var_smoothing * max_var.max(1e-9);
        for var in &mut self.variances {
            var.mapv_inplace(|v| v + floor);
        }

        self.priors = [
            class_rows[0].len() as f64 / n as f64,
            class_rows[1].len() as f64 / n as f64,
        ];
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.means.len() == 2 && self.variances.len() == 2
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::from_iter(x.rows().into_iter().map(|row| {
            let log_joint: Vec<f64> = (0..2)
                .map(|class| {
                    let mut lj = self.priors[class].max(1e-300).ln();
                    for (j, &v) in row.iter().enumerate() {
                        let mean = self.means[class][j];
                        let var = self.variances[class][j];
                        lj += -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                            - (v - mean).powi(2) / (2.0 * var);
                    }
                    lj
                })
                .collect();

            // Normalise in log space for the two-class posterior.
            let max = log_joint[0].max(log_joint[1]);
            let e0 = (log_joint[0] - max).exp();
            let e1 = (log_joint[1] - max).exp();
            e1 / (e0 + e1)
        }))
    }
}
