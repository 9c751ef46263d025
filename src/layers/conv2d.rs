use crate::conv2d_impl::{col2nchw, im2col, Window};
use crate::{Error, Result, Tensor};
use ndarray::{Array4, Ix4};

/// Bias-free 2D convolution over NCHW input.
///
/// Weights are stored as `(out_channels, in_channels, kernel_h, kernel_w)`.
#[derive(Debug, Clone)]
pub struct Conv2d {
    name: String,
    window: Window,
    weights: Array4<f32>,
}

impl Conv2d {
    /// Zero-initialized square-kernel convolution with unit stride.
    pub fn new(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: usize,
    ) -> Self {
        Self {
            name: name.into(),
            window: Window {
                kernel: (kernel_size, kernel_size),
                stride: (1, 1),
                padding: (padding, padding),
            },
            weights: Array4::zeros((out_channels, in_channels, kernel_size, kernel_size)),
        }
    }

    pub fn with_weights(
        name: impl Into<String>,
        weights: Array4<f32>,
        strides: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self> {
        let name = name.into();
        let (_, _, kh, kw) = weights.dim();
        if kh == 0 || kw == 0 || strides.0 == 0 || strides.1 == 0 {
            return Err(Error::Layer(format!(
                "Conv2d {}: kernel {:?} and strides {:?} must be non-zero",
                name,
                (kh, kw),
                strides
            )));
        }

        Ok(Self {
            name,
            window: Window {
                kernel: (kh, kw),
                stride: strides,
                padding,
            },
            weights: weights.as_standard_layout().into_owned(),
        })
    }

    pub fn in_channels(&self) -> usize {
        self.weights.dim().1
    }

    pub fn out_channels(&self) -> usize {
        self.weights.dim().0
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.window.kernel
    }

    pub fn weights(&self) -> &Array4<f32> {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut Array4<f32> {
        &mut self.weights
    }

    fn spatial_output(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        self.window.output_size(height, width).ok_or_else(|| {
            Error::Layer(format!(
                "Conv2d {}: input {}x{} is smaller than kernel {:?}",
                self.name, height, width, self.window.kernel
            ))
        })
    }
}

impl super::Layer for Conv2d {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let (batch_size, in_channels, height, width) = input.dims4()?;

        if in_channels != self.in_channels() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_channels()],
                actual: vec![in_channels],
            });
        }

        let (out_height, out_width) = self.spatial_output(height, width)?;

        let input_view = input
            .data()
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|e| Error::Layer(format!("Conv2d {}: {}", self.name, e)))?;
        let cols = im2col(input_view, &self.window, out_height, out_width);

        let (kh, kw) = self.window.kernel;
        let kernel_matrix = self
            .weights
            .view()
            .into_shape_with_order((self.out_channels(), in_channels * kh * kw))
            .map_err(|e| Error::Layer(format!("Reshape failed: {}", e)))?;

        let product = cols.dot(&kernel_matrix.t());
        let output = col2nchw(&product, batch_size, out_height, out_width);

        Ok(Tensor::from_array4(output))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match *input_shape {
            [batch, channels, height, width] => {
                if channels != self.in_channels() {
                    return Err(Error::ShapeMismatch {
                        expected: vec![self.in_channels()],
                        actual: vec![channels],
                    });
                }
                let (out_height, out_width) = self.spatial_output(height, width)?;
                Ok(vec![batch, self.out_channels(), out_height, out_width])
            }
            _ => Err(Error::Layer(format!(
                "Conv2d expects 4D input, got {:?}",
                input_shape
            ))),
        }
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(super::LayerMut<'_>)) {
        f(super::LayerMut::Conv2d(self));
    }

    fn num_parameters(&self) -> usize {
        self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::super::Layer;
    use super::*;

    #[test]
    fn test_conv2d_identity_kernel() {
        let weights = Array4::from_shape_fn((1, 1, 1, 1), |_| 1.0);
        let layer = Conv2d::with_weights("test_conv", weights, (1, 1), (0, 0)).unwrap();

        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 2, 2]);
        assert_eq!(output.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_conv2d_same_padding_sums_neighbourhood() {
        let weights = Array4::from_elem((1, 1, 3, 3), 1.0);
        let layer = Conv2d::with_weights("test_conv", weights, (1, 1), (1, 1)).unwrap();

        let input = Tensor::from_vec(vec![1.0; 9], &[1, 1, 3, 3]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 3, 3]);
        let result = output.to_vec();
        assert_eq!(result[0], 4.0);
        assert_eq!(result[1], 6.0);
        assert_eq!(result[4], 9.0);
    }

    #[test]
    fn test_conv2d_strided() {
        let weights = Array4::from_elem((1, 1, 1, 1), 1.0);
        let layer = Conv2d::with_weights("test_conv", weights, (2, 2), (0, 0)).unwrap();

        let input = Tensor::from_vec((1..=16).map(|v| v as f32).collect(), &[1, 1, 4, 4]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1, 2, 2]);
        assert_eq!(output.to_vec(), vec![1.0, 3.0, 9.0, 11.0]);

        // (5 + 2 - 2) / 2 + 1 rows, (5 + 2 - 2) / 3 + 1 columns
        let weights = Array4::from_elem((1, 1, 2, 2), 1.0);
        let layer = Conv2d::with_weights("test_conv", weights, (2, 3), (1, 1)).unwrap();
        assert_eq!(
            layer.output_shape(&[1, 1, 5, 5]).unwrap(),
            vec![1, 1, 3, 2]
        );
        assert!(Conv2d::with_weights("test_conv", Array4::zeros((1, 1, 1, 1)), (0, 1), (0, 0))
            .is_err());
    }

    #[test]
    fn test_conv2d_mixes_channels() {
        // out_0 = in_0 + 2 * in_1, out_1 = -in_0
        let weights =
            Array4::from_shape_vec((2, 2, 1, 1), vec![1.0, 2.0, -1.0, 0.0]).unwrap();
        let layer = Conv2d::with_weights("test_conv", weights, (1, 1), (0, 0)).unwrap();

        let input = Tensor::from_vec(vec![1.0, 3.0], &[1, 2, 1, 1]).unwrap();
        let output = layer.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 2, 1, 1]);
        assert_eq!(output.to_vec(), vec![7.0, -1.0]);
    }

    #[test]
    fn test_conv2d_channel_mismatch() {
        let layer = Conv2d::new("test_conv", 3, 4, 3, 1);
        let input = Tensor::zeros(&[1, 2, 4, 4]);

        assert!(matches!(
            layer.forward(&input),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_conv2d_output_shape() {
        let layer = Conv2d::new("test_conv", 1, 24, 3, 1);

        assert_eq!(
            layer.output_shape(&[8, 1, 128, 192]).unwrap(),
            vec![8, 24, 128, 192]
        );
        assert_eq!(layer.num_parameters(), 24 * 9);
    }
}
