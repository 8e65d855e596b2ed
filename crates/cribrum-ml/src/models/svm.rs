//! Support-vector classifier with probability output.
//!
//! Trained by the simplified SMO procedure; probabilities come from Platt
//! scaling, a sigmoid fitted on the training-set decision values.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use cribrum_common::{CribrumError, Result};

use super::logistic::sigmoid;

const SMO_TOLERANCE: f64 = 1e-3;
const SMO_MAX_PASSES: usize = 10;
const SMO_MAX_ITER: usize = 200;
const PLATT_ITER: usize = 300;
const PLATT_LEARNING_RATE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kernel {
    Linear,
    Rbf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svc {
    c: f64,
    kernel: Kernel,
    gamma: f64,
    seed: u64,
    // Support set: rows with non-negligible multipliers after training.
    support: Array2<f64>,
    // alpha_i * y_i per support vector (y in {-1, +1}).
    dual_coef: Array1<f64>,
    intercept: f64,
    platt_a: f64,
    platt_b: f64,
}

impl Svc {
    pub fn new(c: f64, kernel: Kernel, seed: u64) -> Self {
        Self {
            c,
            kernel,
            gamma: 1.0,
            seed,
            support: Array2::zeros((0, 0)),
            dual_coef: Array1::zeros(0),
            intercept: 0.0,
            platt_a: -1.0,
            platt_b: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(CribrumError::Pipeline(
                "cannot fit SVC on zero rows".to_string(),
            ));
        }
        self.gamma = 1.0 / x.ncols().max(1) as f64;

        // {0,1} labels → {-1,+1} for the dual problem.
        let y_signed: Vec<f64> = y.iter().map(|&t| if t > 0.5 { 1.0 } else { -1.0 }).collect();

        let mut alphas = vec![0.0f64; n];
        let mut b = 0.0f64;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let kernel_row = |i: usize, j: usize| self.kernel_value(x.row(i), x.row(j));
        let decision = |alphas: &[f64], b: f64, i: usize| -> f64 {
            let mut f = b;
            for j in 0..n {
                if alphas[j] > 0.0 {
                    f += alphas[j] * y_signed[j] * kernel_row(j, i);
                }
            }
            f
        };

        let mut passes = 0;
        let mut iter = 0;
        // SMO needs a pair of rows to optimise over.
        while n >= 2 && passes < SMO_MAX_PASSES && iter < SMO_MAX_ITER {
            iter += 1;
            let mut changed = 0;
            for i in 0..n {
                let e_i = decision(&alphas, b, i) - y_signed[i];
                let violates = (y_signed[i] * e_i < -SMO_TOLERANCE && alphas[i] < self.c)
                    || (y_signed[i] * e_i > SMO_TOLERANCE && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = decision(&alphas, b, j) - y_signed[j];

                let (alpha_i_old, alpha_j_old) = (alphas[i], alphas[j]);
                let (low, high) = if (y_signed[i] - y_signed[j]).abs() < 0.5 {
                    (
                        (alpha_i_old + alpha_j_old - self.c).max(0.0),
                        (alpha_i_old + alpha_j_old).min(self.c),
                    )
                } else {
                    (
                        (alpha_j_old - alpha_i_old).max(0.0),
                        (self.c + alpha_j_old - alpha_i_old).min(self.c),
                    )
                };
                if (high - low).abs() < 1e-12 {
                    continue;
                }

                let eta = 2.0 * kernel_row(i, j) - kernel_row(i, i) - kernel_row(j, j);
                if eta >= 0.0 {
                    continue;
                }

                let mut alpha_j = alpha_j_old - y_signed[j] * (e_i - e_j) / eta;
                alpha_j = alpha_j.clamp(low, high);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y_signed[i] * y_signed[j] * (alpha_j_old - alpha_j);

                let b1 = b
                    - e_i
                    - y_signed[i] * (alpha_i - alpha_i_old) * kernel_row(i, i)
                    - y_signed[j] * (alpha_j - alpha_j_old) * kernel_row(i, j);
                let b2 = b
                    - e_j
                    - y_signed[i] * (alpha_i - alpha_i_old) * kernel_row(i, j)
                    - y_signed[j] * (alpha_j - alpha_j_old) * kernel_row(j, j);
                b = if alpha_i > 0.0 && alpha_i < self.c {
                    b1
                } else if alpha_j > 0.0 && alpha_j < self.c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                alphas[i] = alpha_i;
                alphas[j] = alpha_j;
                changed += 1;
            }
            if changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        // Keep only the support set.
        let support_idx: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        let mut support = Array2::<f64>::zeros((support_idx.len(), x.ncols()));
        let mut dual_coef = Array1::<f64>::zeros(support_idx.len());
        for (k, &i) in support_idx.iter().enumerate() {
            support.row_mut(k).assign(&x.row(i));
            dual_coef[k] = alphas[i] * y_signed[i];
        }
        self.support = support;
        self.dual_coef = dual_coef;
        self.intercept = b;

        self.fit_platt(x, y);
        Ok(())
    }

    fn kernel_value(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.kernel {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf => {
                let sq: f64 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum();
                (-self.gamma * sq).exp()
            }
        }
    }

    fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::from_iter(x.rows().into_iter().map(|row| {
            let mut f = self.intercept;
            for (k, sv) in self.support.rows().into_iter().enumerate() {
                f += self.dual_coef[k] * self.kernel_value(sv, row);
            }
            f
        }))
    }

    /// Fit the Platt sigmoid P(active | f) = σ(a·f + b) on the training
    /// decision values by gradient descent on the cross-entropy.
    fn fit_platt(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let f = self.decision_function(x);
        let n = f.len() as f64;
        let mut a = 1.0f64;
        let mut b = 0.0f64;
        for _ in 0..PLATT_ITER {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            for (fi, ti) in f.iter().zip(y.iter()) {
                let p = sigmoid(a * fi + b);
                grad_a += (p - ti) * fi;
                grad_b += p - ti;
            }
            a -= PLATT_LEARNING_RATE * grad_a / n;
            b -= PLATT_LEARNING_RATE * grad_b / n;
        }
        self.platt_a = a;
        self.platt_b = b;
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_function(x)
            .mapv(|f| sigmoid(self.platt_a * f + self.platt_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn xor_free_data() -> (Array2<f64>, Array1<f64>) {
        (
            arr2(&[
                [0.0, 0.1],
                [0.1, 0.0],
                [0.2, 0.2],
                [0.9, 1.0],
                [1.0, 0.9],
                [0.8, 0.8],
            ]),
            arr1(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
        )
    }

    #[test]
    fn test_linear_svc_separates() {
        let (x, y) = xor_free_data();
        let mut model = Svc::new(1.0, Kernel::Linear, 42);
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x);
        assert!(probs[0] < 0.5, "got {:?}", probs);
        assert!(probs[3] > 0.5, "got {:?}", probs);
    }

    #[test]
    fn test_rbf_svc_separates() {
        let (x, y) = xor_free_data();
        let mut model = Svc::new(10.0, Kernel::Rbf, 42);
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x);
        assert!(probs[0] < 0.5, "got {:?}", probs);
        assert!(probs[4] > 0.5, "got {:?}", probs);
    }

    #[test]
    fn test_probabilities_bounded() {
        let (x, y) = xor_free_data();
        let mut model = Svc::new(0.1, Kernel::Rbf, 1);
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x) {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
