//! L2-regularised logistic regression trained by batch gradient descent.
//!
//! `c` is the inverse regularisation strength (larger c, weaker penalty),
//! matching the convention of the grid values it is tuned over.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use cribrum_common::{CribrumError, Result};

const LEARNING_RATE: f64 = 0.5;
const MAX_ITER: usize = 2000;
const TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    c: f64,
    weights: Array1<f64>,
    bias: f64,
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            weights: Array1::zeros(0),
            bias: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(CribrumError::Pipeline(
                "cannot fit logistic regression on zero rows".to_string(),
            ));
        }
        let lambda = 1.0 / (self.c * n as f64);

        self.weights = Array1::zeros(x.ncols());
        self.bias = 0.0;

        let mut prev_loss = f64::INFINITY;
        for _ in 0..MAX_ITER {
            let probs = self.predict_proba(x);
            let errors = &probs - y;

            let grad_w = x.t().dot(&errors) / n as f64 + &self.weights * lambda;
            let grad_b = errors.sum() / n as f64;

            self.weights -= &(grad_w * LEARNING_RATE);
            self.bias -= grad_b * LEARNING_RATE;

            let loss = log_loss(&probs, y) + 0.5 * lambda * self.weights.dot(&self.weights);
            if (prev_loss - loss).abs() < TOLERANCE {
                break;
            }
            prev_loss = loss;
        }
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let z = x.dot(&self.weights) + self.bias;
        z.mapv(sigmoid)
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn log_loss(probs: &Array1<f64>, y: &Array1<f64>) -> f64 {
    let n = probs.len() as f64;
    probs
        .iter()
        .zip(y.iter())
        .map(|(p, t)| {
            let p = p.clamp(1e-12, 1.0 - 1e-12);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n
}
