use crate::{Error, Result, Tensor};
use ndarray::{Array1, Array2, Ix2};

/// Fully connected layer, `y = x W^T + b`. No activation is applied, so a
/// classifier head emits raw logits.
///
/// Weights are stored as `(out_features, in_features)`.
#[derive(Debug, Clone)]
pub struct Linear {
    name: String,
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    /// Zero-initialized layer.
    pub fn new(name: impl Into<String>, in_features: usize, out_features: usize) -> Self {
        Self {
            name: name.into(),
            weights: Array2::zeros((out_features, in_features)),
            bias: Array1::zeros(out_features),
        }
    }

    pub fn with_weights(
        name: impl Into<String>,
        weights: Array2<f32>,
        bias: Array1<f32>,
    ) -> Result<Self> {
        let units = weights.nrows();

        if bias.len() != units {
            return Err(Error::Layer(format!(
                "Bias size {} doesn't match units {}",
                bias.len(),
                units
            )));
        }

        Ok(Self {
            name: name.into(),
            weights,
            bias,
        })
    }

    pub fn in_features(&self) -> usize {
        self.weights.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut Array2<f32> {
        &mut self.weights
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn bias_mut(&mut self) -> &mut Array1<f32> {
        &mut self.bias
    }
}

impl super::Layer for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let input_shape = input.shape();

        let features = match *input_shape {
            [_, features] => features,
            _ => {
                return Err(Error::Layer(format!(
                    "Linear layer expects 2D input, got {:?}",
                    input_shape
                )))
            }
        };

        if features != self.in_features() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_features()],
                actual: vec![features],
            });
        }

        let input_2d = input
            .data()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;

        let output = input_2d.dot(&self.weights.t()) + &self.bias;

        Ok(Tensor::new(output.into_dyn()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match *input_shape {
            [batch, features] if features == self.in_features() => {
                Ok(vec![batch, self.out_features()])
            }
            [_, features] => Err(Error::ShapeMismatch {
                expected: vec![self.in_features()],
                actual: vec![features],
            }),
            _ => Err(Error::Layer(format!(
                "Linear layer expects 2D input, got {:?}",
                input_shape
            ))),
        }
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(super::LayerMut<'_>)) {
        f(super::LayerMut::Linear(self));
    }

    fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}
