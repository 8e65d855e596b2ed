//! Evaluation metric battery.
//!
//! All metrics derive from the binary confusion matrix plus the predicted
//! probabilities for AUC. The F-measure here is the harmonic mean of
//! sensitivity and specificity — not the textbook precision/recall F1 —
//! kept for compatibility with the metrics history of earlier runs.

use serde::{Deserialize, Serialize};

/// Binary confusion matrix with the active class as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut cm = ConfusionMatrix {
            tp: 0,
            tn: 0,
            fp: 0,
            fn_: 0,
        };
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t > 0.5, p > 0.5) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn matthews(&self) -> f64 {
        let (tp, tn, fp, fn_) = (
            self.tp as f64,
            self.tn as f64,
            self.fp as f64,
            self.fn_ as f64,
        );
        let denom = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if denom == 0.0 {
            0.0
        } else {
            (tp * tn - fp * fn_) / denom
        }
    }

    pub fn cohen_kappa(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let po = self.accuracy();
        let p_yes = ((self.tp + self.fp) as f64 / n) * ((self.tp + self.fn_) as f64 / n);
        let p_no = ((self.tn + self.fn_) as f64 / n) * ((self.tn + self.fp) as f64 / n);
        let pe = p_yes + p_no;
        if (1.0 - pe).abs() < 1e-12 {
            0.0
        } else {
            (po - pe) / (1.0 - pe)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// One row of the persisted metrics table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRow {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Split")]
    pub split: String,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Sensitivity")]
    pub sensitivity: f64,
    #[serde(rename = "Specificity")]
    pub specificity: f64,
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Error")]
    pub error_rate: f64,
    #[serde(rename = "F-Measure")]
    pub f_measure: f64,
    #[serde(rename = "Cohen Kappa")]
    pub kappa: f64,
    #[serde(rename = "MCC")]
    pub mcc: f64,
    #[serde(rename = "AUC ROC")]
    pub auc_roc: f64,
}

/// Compute the full battery for one (model, split) pair.
///
/// Percentage-scale metrics are reported ×100; F-measure, kappa, MCC and
/// AUC stay unscaled. Everything is rounded to two decimals.
pub fn evaluate(
    model: &str,
    split: &str,
    y_true: &[f64],
    y_pred: &[f64],
    y_prob: &[f64],
) -> MetricsRow {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred);
    let sensitivity = cm.sensitivity();
    let specificity = cm.specificity();
    let f_measure = if sensitivity + specificity > 0.0 {
        2.0 * sensitivity * specificity / (sensitivity + specificity)
    } else {
        0.0
    };

    MetricsRow {
        model: model.to_string(),
        split: split.to_string(),
        recall: round2(sensitivity * 100.0),
        precision: round2(cm.precision() * 100.0),
        sensitivity: round2(sensitivity * 100.0),
        specificity: round2(specificity * 100.0),
        accuracy: round2(cm.accuracy() * 100.0),
        error_rate: round2((1.0 - cm.accuracy()) * 100.0),
        f_measure: round2(f_measure),
        kappa: round2(cm.cohen_kappa()),
        mcc: round2(cm.matthews()),
        auc_roc: round2(roc_auc(y_true, y_prob)),
    }
}

/// AUC-ROC via the rank (Mann-Whitney) formulation with midranks for ties.
/// Guarded to 0 when a split holds a single class.
pub fn roc_auc(y_true: &[f64], y_prob: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..y_prob.len()).collect();
    order.sort_by(|&a, &b| {
        y_prob[a]
            .partial_cmp(&y_prob[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Midrank assignment over tied probabilities.
    let mut ranks = vec![0.0f64; y_prob.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && (y_prob[order[j + 1]] - y_prob[order[i]]).abs() < 1e-12 {
            j += 1;
        }
        let midrank = (i + j + 2) as f64 / 2.0;
        for k in i..=j {
            ranks[order[k]] = midrank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_counts() {
        let y_true = [1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = [1.0, 0.0, 0.0, 1.0, 1.0];
        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred);
        assert_eq!(cm.tp, 2);
        assert_eq!(cm.fn_, 1);
        assert_eq!(cm.tn, 1);
        assert_eq!(cm.fp, 1);
    }

    #[test]
    fn test_zero_guards() {
        // All-negative truth and predictions: no positives anywhere.
        let y = [0.0, 0.0, 0.0];
        let cm = ConfusionMatrix::from_labels(&y, &y);
        assert_eq!(cm.sensitivity(), 0.0);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.specificity(), 1.0);
        assert_eq!(cm.matthews(), 0.0);
    }

    #[test]
    fn test_perfect_classifier_metrics() {
        let y_true = [1.0, 0.0, 1.0, 0.0];
        let y_prob = [0.9, 0.1, 0.8, 0.2];
        let row = evaluate("LR", "test", &y_true, &y_true, &y_prob);
        assert_eq!(row.accuracy, 100.0);
        assert_eq!(row.error_rate, 0.0);
        assert_eq!(row.f_measure, 1.0);
        assert_eq!(row.kappa, 1.0);
        assert_eq!(row.mcc, 1.0);
        assert_eq!(row.auc_roc, 1.0);
    }

    #[test]
    fn test_auc_handles_ties_and_single_class() {
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.9, 0.8]), 0.0);
        let auc = roc_auc(&[1.0, 0.0], &[0.5, 0.5]);
        assert!((auc - 0.5).abs() < 1e-12);
        let auc = roc_auc(&[1.0, 0.0, 1.0, 0.0], &[0.9, 0.1, 0.7, 0.3]);
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_f_measure_uses_specificity_not_precision() {
        // tp=2 fn=0 (sensitivity 1.0), tn=1 fp=1 (specificity 0.5).
        let y_true = [1.0, 1.0, 0.0, 0.0];
        let y_pred = [1.0, 1.0, 1.0, 0.0];
        let y_prob = [0.9, 0.8, 0.6, 0.1];
        let row = evaluate("DT", "train", &y_true, &y_pred, &y_prob);
        // Harmonic mean of sensitivity and specificity = 0.67; the
        // precision/recall F1 would be 0.8.
        assert_eq!(row.f_measure, 0.67);
    }
}
