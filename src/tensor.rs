use ndarray::{concatenate, Array, Array4, ArrayD, Axis, Dimension, IxDyn};

use crate::{Error, Result};

/// Dense `f32` tensor. Image batches are laid out NCHW.
#[derive(Clone, Debug)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    pub fn from_vec(vec: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != vec.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![expected],
                actual: vec![vec.len()],
            });
        }
        let data = Array::from_shape_vec(IxDyn(shape), vec)
            .map_err(|e| Error::Layer(format!("Tensor construction failed: {}", e)))?;
        Ok(Self { data })
    }

    pub fn from_shape_fn<F>(shape: &[usize], mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> f32,
    {
        let data = ArrayD::from_shape_fn(IxDyn(shape), |idx| f(idx.slice()));
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.data
    }

    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    pub fn zeros(shape: &[usize]) -> Self {
        let data = ArrayD::zeros(IxDyn(shape));
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self> {
        self.clone().into_reshape(new_shape)
    }

    pub fn into_reshape(self, new_shape: &[usize]) -> Result<Self> {
        let total_elements: usize = new_shape.iter().product();
        if total_elements != self.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![total_elements],
                actual: vec![self.len()],
            });
        }

        let reshaped = self
            .data
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order(IxDyn(new_shape))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;
        Ok(Self { data: reshaped })
    }

    /// Returns `(batch, channels, height, width)` for a 4D tensor.
    pub fn dims4(&self) -> Result<(usize, usize, usize, usize)> {
        match *self.shape() {
            [n, c, h, w] => Ok((n, c, h, w)),
            _ => Err(Error::Layer(format!(
                "expected a 4D NCHW tensor, got {:?}",
                self.shape()
            ))),
        }
    }

    pub fn to_array4(&self) -> Result<Array4<f32>> {
        let dims = self.dims4()?;
        self.data
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order(dims)
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))
    }

    pub fn from_array4(data: Array4<f32>) -> Self {
        Self {
            data: data.into_dyn(),
        }
    }

    /// Concatenates `other` after `self` along the channel axis.
    pub fn concat_channels(&self, other: &Tensor) -> Result<Self> {
        let (n, _, h, w) = self.dims4()?;
        let (on, _, oh, ow) = other.dims4()?;
        if (n, h, w) != (on, oh, ow) {
            return Err(Error::ShapeMismatch {
                expected: vec![n, h, w],
                actual: vec![on, oh, ow],
            });
        }

        let data = concatenate(Axis(1), &[self.data.view(), other.data.view()])
            .map_err(|e| Error::Layer(format!("Concatenation failed: {}", e)))?;
        Ok(Self { data })
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::new(data)
    }
}

impl AsRef<ArrayD<f32>> for Tensor {
    fn as_ref(&self) -> &ArrayD<f32> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_channels() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0; 8], &[1, 2, 2, 2]).unwrap();

        let out = a.concat_channels(&b).unwrap();

        assert_eq!(out.shape(), &[1, 3, 2, 2]);
        assert_eq!(&out.to_vec()[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert!(out.to_vec()[4..].iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_concat_channels_spatial_mismatch() {
        let a = Tensor::zeros(&[1, 1, 2, 2]);
        let b = Tensor::zeros(&[1, 1, 3, 2]);

        assert!(a.concat_channels(&b).is_err());
    }

    #[test]
    fn test_dims4_rejects_other_ranks() {
        assert!(Tensor::zeros(&[2, 3]).dims4().is_err());
        assert_eq!(Tensor::zeros(&[2, 3, 4, 5]).dims4().unwrap(), (2, 3, 4, 5));
    }
}
