//! Batch-level classification metrics for multi-label outputs.
//!
//! Counts are pooled over every sample and every label position; nothing is
//! averaged per class and no state survives between calls.
//!
//! Predictions are `output > threshold` with [`DEFAULT_THRESHOLD`] = 0.5
//! applied to the raw network outputs. Since those outputs are logits, the
//! sigmoid-consistent boundary would be 0.0; use [`Confusion::with_threshold`]
//! for that. A label counts as positive when it truncates to a nonzero
//! integer, i.e. `label >= 1.0` for non-negative labels.
//!
//! Every ratio with a zero denominator evaluates to 0.0.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::Zip;

use crate::{Error, Result, Tensor};

pub const DEFAULT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn new(outputs: &Tensor, labels: &Tensor) -> Result<Self> {
        Self::with_threshold(outputs, labels, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(outputs: &Tensor, labels: &Tensor, threshold: f32) -> Result<Self> {
        if labels.shape() != outputs.shape() {
            return Err(Error::ShapeMismatch {
                expected: outputs.shape().to_vec(),
                actual: labels.shape().to_vec(),
            });
        }

        let counts = Zip::from(outputs.data()).and(labels.data()).fold(
            Confusion::default(),
            |mut counts, &output, &label| {
                let predicted = output > threshold;
                let actual = label.trunc() != 0.0;
                match (predicted, actual) {
                    (true, true) => counts.tp += 1,
                    (false, false) => counts.tn += 1,
                    (true, false) => counts.fp += 1,
                    (false, true) => counts.fn_ += 1,
                }
                counts
            },
        );

        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn accuracy(&self) -> f32 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn error_rate(&self) -> f32 {
        ratio(self.fp + self.fn_, self.total())
    }

    pub fn precision(&self) -> f32 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f32 {
        ratio(self.tp, self.tp + self.fn_)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

/// Fraction of all label positions predicted correctly.
pub fn accuracy(outputs: &Tensor, labels: &Tensor) -> Result<f32> {
    Ok(Confusion::new(outputs, labels)?.accuracy())
}

/// `tp / (tp + fp)`; 0.0 when nothing is predicted positive.
pub fn precision(outputs: &Tensor, labels: &Tensor) -> Result<f32> {
    Ok(Confusion::new(outputs, labels)?.precision())
}

/// `tp / (tp + fn)`; 0.0 when no label is positive.
pub fn recall(outputs: &Tensor, labels: &Tensor) -> Result<f32> {
    Ok(Confusion::new(outputs, labels)?.recall())
}

pub type MetricFn = fn(&Tensor, &Tensor) -> Result<f32>;

/// Named registry of the metrics reported by a training harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Accuracy, Metric::Precision, Metric::Recall];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
        }
    }

    pub fn function(&self) -> MetricFn {
        match self {
            Metric::Accuracy => accuracy,
            Metric::Precision => precision,
            Metric::Recall => recall,
        }
    }

    pub fn compute(&self, outputs: &Tensor, labels: &Tensor) -> Result<f32> {
        (self.function())(outputs, labels)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown metric: {}", s)))
    }
}

/// Every registered metric, keyed by name. The confusion counts are computed once.
pub fn evaluate_all(outputs: &Tensor, labels: &Tensor) -> Result<BTreeMap<&'static str, f32>> {
    let counts = Confusion::new(outputs, labels)?;
    Ok(Metric::ALL
        .into_iter()
        .map(|metric| {
            let value = match metric {
                Metric::Accuracy => counts.accuracy(),
                Metric::Precision => counts.precision(),
                Metric::Recall => counts.recall(),
            };
            (metric.name(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn t(values: &[f32], shape: &[usize]) -> Tensor {
        Tensor::from_vec(values.to_vec(), shape).unwrap()
    }

    #[test]
    fn test_confusion_counts() {
        let outputs = t(&[0.9, 0.1, 0.7, 0.2, 0.6, 0.4], &[2, 3]);
        let labels = t(&[1.0, 0.0, 0.0, 1.0, 1.0, 0.0], &[2, 3]);

        let counts = Confusion::new(&outputs, &labels).unwrap();

        assert_eq!(
            counts,
            Confusion {
                tp: 2,
                tn: 2,
                fp: 1,
                fn_: 1
            }
        );
        assert_abs_diff_eq!(counts.accuracy(), 4.0 / 6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(counts.precision(), 2.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(counts.recall(), 2.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_threshold_is_strict_and_literal() {
        // a logit of 0.3 is "positive" after a sigmoid but not at the 0.5 cut
        let outputs = t(&[0.5, 0.3], &[1, 2]);
        let labels = t(&[1.0, 1.0], &[1, 2]);

        assert_eq!(Confusion::new(&outputs, &labels).unwrap().tp, 0);
        assert_eq!(
            Confusion::with_threshold(&outputs, &labels, 0.0).unwrap().tp,
            2
        );
    }

    #[test]
    fn test_soft_labels_truncate() {
        let outputs = t(&[1.0, 1.0], &[1, 2]);
        let labels = t(&[0.9, 1.0], &[1, 2]);

        let counts = Confusion::new(&outputs, &labels).unwrap();
        assert_eq!((counts.tp, counts.fp), (1, 1));
    }

    #[test]
    fn test_zero_denominators() {
        let outputs = t(&[-1.0, -2.0], &[1, 2]);
        let labels = t(&[0.0, 0.0], &[1, 2]);

        assert_eq!(precision(&outputs, &labels).unwrap(), 0.0);
        assert_eq!(recall(&outputs, &labels).unwrap(), 0.0);
        assert_eq!(accuracy(&outputs, &labels).unwrap(), 1.0);

        let empty = Tensor::zeros(&[0, 4]);
        assert_eq!(accuracy(&empty, &empty).unwrap(), 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(accuracy(&Tensor::zeros(&[4, 10]), &Tensor::zeros(&[4, 8])).is_err());
    }

    #[test]
    fn test_registry() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>().unwrap(), metric);
            assert_eq!(metric.to_string(), metric.name());
        }
        assert!("f1".parse::<Metric>().is_err());

        let outputs = t(&[0.9, 0.1, 0.7, 0.2], &[2, 2]);
        let labels = t(&[1.0, 0.0, 1.0, 1.0], &[2, 2]);
        let all = evaluate_all(&outputs, &labels).unwrap();

        assert_eq!(all.len(), 3);
        for metric in Metric::ALL {
            assert_eq!(all[metric.name()], metric.compute(&outputs, &labels).unwrap());
        }
        assert_eq!(all["precision"], 1.0);
    }
}
