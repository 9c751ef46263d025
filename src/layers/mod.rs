pub mod batch_normalization;
pub mod conv2d;
pub mod flatten;
pub mod linear;
pub mod pooling;

use crate::{Result, Tensor};

pub trait Layer: std::fmt::Debug + Send + Sync {
    /// Inference-mode forward pass.
    fn forward(&self, input: &Tensor) -> Result<Tensor>;

    /// Training-mode forward pass. Layers whose behavior differs between
    /// modes (batch normalization) override this; it may update internal state.
    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        self.forward(input)
    }

    fn name(&self) -> &str;

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>>;

    /// Calls `f` once for every parameterized primitive reachable from this layer.
    fn visit_mut(&mut self, _f: &mut dyn FnMut(LayerMut<'_>)) {}

    fn num_parameters(&self) -> usize {
        0
    }
}

/// A mutable handle to one parameterized primitive.
///
/// Used by weight initialization and by external optimizers to reach every
/// trainable tensor without inspecting layer types at runtime.
#[derive(Debug)]
pub enum LayerMut<'a> {
    Conv2d(&'a mut Conv2d),
    BatchNorm2d(&'a mut BatchNorm2d),
    Linear(&'a mut Linear),
}

pub use batch_normalization::BatchNorm2d;
pub use conv2d::Conv2d;
pub use flatten::Flatten;
pub use linear::Linear;
pub use pooling::AvgPool2d;
