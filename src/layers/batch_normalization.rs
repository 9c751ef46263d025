use crate::{Error, Result, Tensor};
use ndarray::{Array1, Axis};

pub const DEFAULT_EPSILON: f32 = 1e-5;
pub const DEFAULT_MOMENTUM: f32 = 0.1;

/// Per-channel batch normalization over axis 1 of an `(N, C, ...)` tensor.
#[derive(Debug, Clone)]
pub struct BatchNorm2d {
    name: String,
    weight: Array1<f32>,
    bias: Array1<f32>,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
    epsilon: f32,
    momentum: f32,
}

impl BatchNorm2d {
    /// Unit scale, zero shift, zero running mean and unit running variance.
    pub fn new(name: impl Into<String>, num_features: usize) -> Self {
        Self {
            name: name.into(),
            weight: Array1::ones(num_features),
            bias: Array1::zeros(num_features),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            epsilon: DEFAULT_EPSILON,
            momentum: DEFAULT_MOMENTUM,
        }
    }

    pub fn with_parameters(
        name: impl Into<String>,
        weight: Array1<f32>,
        bias: Array1<f32>,
        running_mean: Array1<f32>,
        running_var: Array1<f32>,
        epsilon: f32,
    ) -> Result<Self> {
        let name = name.into();
        let num_features = weight.len();

        for (label, len) in [
            ("bias", bias.len()),
            ("running_mean", running_mean.len()),
            ("running_var", running_var.len()),
        ] {
            if len != num_features {
                return Err(Error::Layer(format!(
                    "BatchNorm2d {}: {} length {} doesn't match weight length {}",
                    name, label, len, num_features
                )));
            }
        }

        Ok(Self {
            name,
            weight,
            bias,
            running_mean,
            running_var,
            epsilon,
            momentum: DEFAULT_MOMENTUM,
        })
    }

    pub fn num_features(&self) -> usize {
        self.weight.len()
    }

    pub fn weight_mut(&mut self) -> &mut Array1<f32> {
        &mut self.weight
    }

    pub fn bias_mut(&mut self) -> &mut Array1<f32> {
        &mut self.bias
    }

    pub fn weight(&self) -> &Array1<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn running_mean(&self) -> &Array1<f32> {
        &self.running_mean
    }

    pub fn running_var(&self) -> &Array1<f32> {
        &self.running_var
    }

    fn check_input(&self, input: &Tensor) -> Result<()> {
        let shape = input.shape();
        if shape.len() < 2 {
            return Err(Error::Layer(format!(
                "BatchNorm2d {} expects at least 2D input, got {:?}",
                self.name, shape
            )));
        }
        if shape[1] != self.num_features() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.num_features()],
                actual: vec![shape[1]],
            });
        }
        Ok(())
    }

    fn normalize(&self, input: &Tensor, mean: &Array1<f32>, var: &Array1<f32>) -> Tensor {
        let mut output = input.data().clone();

        for (c, mut channel) in output.axis_iter_mut(Axis(1)).enumerate() {
            let std_inv = 1.0 / (var[c] + self.epsilon).sqrt();
            let (gamma, beta, mu) = (self.weight[c], self.bias[c], mean[c]);
            channel.mapv_inplace(|x| gamma * ((x - mu) * std_inv) + beta);
        }

        Tensor::new(output)
    }
}

impl super::Layer for BatchNorm2d {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        self.check_input(input)?;
        Ok(self.normalize(input, &self.running_mean, &self.running_var))
    }

    /// Normalizes with batch statistics and folds them into the running
    /// estimates (unbiased variance for the running estimate).
    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        self.check_input(input)?;

        let per_channel = input.len() / self.num_features();
        if per_channel == 0 {
            return Err(Error::EmptyBatch);
        }

        let mut mean = Array1::zeros(self.num_features());
        let mut var = Array1::zeros(self.num_features());
        for (c, channel) in input.data().axis_iter(Axis(1)).enumerate() {
            let mu = channel.sum() / per_channel as f32;
            mean[c] = mu;
            var[c] = channel.fold(0.0, |acc, &x| acc + (x - mu) * (x - mu)) / per_channel as f32;
        }

        let output = self.normalize(input, &mean, &var);

        let unbias = if per_channel > 1 {
            per_channel as f32 / (per_channel - 1) as f32
        } else {
            1.0
        };
        let m = self.momentum;
        self.running_mean = &self.running_mean * (1.0 - m) + &mean * m;
        self.running_var = &self.running_var * (1.0 - m) + &var * (m * unbias);

        Ok(output)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        if input_shape.len() < 2 || input_shape[1] != self.num_features() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.num_features()],
                actual: input_shape.to_vec(),
            });
        }
        Ok(input_shape.to_vec())
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(super::LayerMut<'_>)) {
        f(super::LayerMut::BatchNorm2d(self));
    }

    fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
