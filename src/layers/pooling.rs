use crate::conv2d_impl::Window;
use crate::{Error, Result, Tensor};
use ndarray::{s, Array4};

/// Average pooling over NCHW input without padding; trailing rows and
/// columns that do not fill a window are dropped.
#[derive(Debug, Clone)]
pub struct AvgPool2d {
    name: String,
    /// `None` pools over the whole spatial extent.
    window: Option<Window>,
}

impl AvgPool2d {
    pub fn new(name: impl Into<String>, pool_size: (usize, usize), strides: Option<(usize, usize)>) -> Self {
        let strides = strides.unwrap_or(pool_size);
        Self {
            name: name.into(),
            window: Some(Window {
                kernel: pool_size,
                stride: strides,
                padding: (0, 0),
            }),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            window: None,
        }
    }

    fn window_for(&self, height: usize, width: usize) -> Window {
        self.window.unwrap_or(Window {
            kernel: (height, width),
            stride: (height.max(1), width.max(1)),
            padding: (0, 0),
        })
    }

    fn compute_output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let window = self.window_for(height, width);
        let degenerate = [window.kernel.0, window.kernel.1, window.stride.0, window.stride.1]
            .contains(&0);
        let fitted = if degenerate {
            None
        } else {
            window.output_size(height, width)
        };
        match fitted {
            Some((h, w)) if h > 0 && w > 0 => Ok((h, w)),
            _ => Err(Error::Layer(format!(
                "AvgPool2d {}: window {:?} does not fit a {}x{} input",
                self.name, window.kernel, height, width
            ))),
        }
    }
}

impl super::Layer for AvgPool2d {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let (batch_size, channels, height, width) = input.dims4()?;
        let (out_height, out_width) = self.compute_output_size(height, width)?;
        let window = self.window_for(height, width);
        let input_4d = input.to_array4()?;

        let count = (window.kernel.0 * window.kernel.1) as f32;
        let output = Array4::from_shape_fn(
            (batch_size, channels, out_height, out_width),
            |(b, c, oh, ow)| {
                let h_start = oh * window.stride.0;
                let w_start = ow * window.stride.1;
                let patch = input_4d.slice(s![
                    b,
                    c,
                    h_start..h_start + window.kernel.0,
                    w_start..w_start + window.kernel.1
                ]);
                patch.sum() / count
            },
        );

        Ok(Tensor::from_array4(output))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match *input_shape {
            [batch, channels, height, width] => {
                let (out_height, out_width) = self.compute_output_size(height, width)?;
                Ok(vec![batch, channels, out_height, out_width])
            }
            _ => Err(Error::Layer(format!(
                "AvgPool2d expects 4D input, got {:?}",
                input_shape
            ))),
        }
    }
}
