//! Multi-label sigmoid cross-entropy.

use ndarray::Zip;

use crate::{Error, Result, Tensor};

/// Mean binary cross-entropy between `sigmoid(outputs)` and `labels`.
///
/// Each position is an independent binary target, so `labels` may be multi-hot
/// or soft. Per element, with `m = max(-x, 0)`:
///
/// `x - x*z + m + ln(exp(-m) + exp(-x - m))`
///
/// Both exponents are non-positive, so large-magnitude logits never overflow.
pub fn loss_fn(outputs: &Tensor, labels: &Tensor) -> Result<f32> {
    if labels.shape() != outputs.shape() {
        return Err(Error::ShapeMismatch {
            expected: outputs.shape().to_vec(),
            actual: labels.shape().to_vec(),
        });
    }
    if outputs.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let total = Zip::from(outputs.data())
        .and(labels.data())
        .fold(0.0_f64, |acc, &x, &z| acc + element_loss(x, z) as f64);

    Ok((total / outputs.len() as f64) as f32)
}

fn element_loss(x: f32, z: f32) -> f32 {
    let max_val = (-x).max(0.0);
    x - x * z + max_val + ((-max_val).exp() + (-x - max_val).exp()).ln()
}
