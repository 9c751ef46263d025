use crate::{Error, Result, Tensor};

/// Collapses every axis after the batch axis: `(N, C, H, W) -> (N, C*H*W)`.
#[derive(Debug, Clone)]
pub struct Flatten {
    name: String,
}

impl Flatten {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl super::Layer for Flatten {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let new_shape = self.output_shape(input.shape())?;
        input.reshape(&new_shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match input_shape.split_first() {
            Some((&batch_size, rest)) => Ok(vec![batch_size, rest.iter().product()]),
            None => Err(Error::Layer(format!(
                "Flatten {} needs a batch axis, got a scalar",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Layer;
    use super::*;

    #[test]
    fn test_flatten_keeps_batch_axis() {
        let layer = Flatten::new("test_flatten");

        let input = Tensor::from_vec((0..24).map(|v| v as f32).collect(), &[2, 3, 2, 2]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[2, 12]);
        assert_eq!(output.to_vec(), input.to_vec());
    }

    #[test]
    fn test_flatten_single_sample_stays_2d() {
        let layer = Flatten::new("test_flatten");

        assert_eq!(layer.output_shape(&[1, 342, 1, 1]).unwrap(), vec![1, 342]);
    }
}
