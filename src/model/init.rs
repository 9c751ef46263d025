//! Weight initialization applied once when a network is built.
//!
//! - convolution weights: `N(0, sqrt(2 / (kh * kw * out_channels)))`
//! - batch-norm: weight 1, bias 0
//! - linear: weight `U(-1/sqrt(in), 1/sqrt(in))`, bias 0

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use tracing::trace;

use crate::layers::{Layer, LayerMut};

/// Standard deviation used for a convolution's weights.
pub fn conv_std(kernel_size: (usize, usize), out_channels: usize) -> f32 {
    let n = kernel_size.0 * kernel_size.1 * out_channels;
    (2.0 / n as f32).sqrt()
}

pub fn init_layer<R: Rng + ?Sized>(layer: LayerMut<'_>, rng: &mut R) {
    match layer {
        LayerMut::Conv2d(conv) => {
            let std = conv_std(conv.kernel_size(), conv.out_channels());
            // std is finite and positive for any non-empty kernel
            if let Ok(normal) = Normal::new(0.0, std) {
                conv.weights_mut().mapv_inplace(|_| normal.sample(rng));
            }
            trace!(
                out_channels = conv.out_channels(),
                in_channels = conv.in_channels(),
                std,
                "initialized conv weights"
            );
        }
        LayerMut::BatchNorm2d(bn) => {
            bn.weight_mut().fill(1.0);
            bn.bias_mut().fill(0.0);
        }
        LayerMut::Linear(linear) => {
            let bound = 1.0 / (linear.in_features().max(1) as f32).sqrt();
            let uniform = Uniform::new_inclusive(-bound, bound);
            linear.weights_mut().mapv_inplace(|_| uniform.sample(rng));
            linear.bias_mut().fill(0.0);
        }
    }
}

/// Initializes every parameterized primitive reachable from `model`.
pub fn init_weights<R: Rng + ?Sized>(model: &mut dyn Layer, rng: &mut R) {
    model.visit_mut(&mut |layer| init_layer(layer, rng));
}
