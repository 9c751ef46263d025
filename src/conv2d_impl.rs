use ndarray::{Array2, Array4, ArrayView4};

/// Geometry of a 2D sliding window over an NCHW input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
}

impl Window {
    pub fn output_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        let padded_h = height + 2 * self.padding.0;
        let padded_w = width + 2 * self.padding.1;
        if padded_h < self.kernel.0 || padded_w < self.kernel.1 {
            return None;
        }
        Some((
            (padded_h - self.kernel.0) / self.stride.0 + 1,
            (padded_w - self.kernel.1) / self.stride.1 + 1,
        ))
    }
}

/// Transform a 4D NCHW input into a 2D matrix for GEMM convolution.
///
/// Rows are indexed by `(batch, out_row, out_col)`, columns by
/// `(channel, kernel_row, kernel_col)`, which matches a weight tensor of shape
/// `(out_channels, in_channels, kh, kw)` flattened to `(out_channels, in_channels * kh * kw)`.
/// Positions falling into the zero padding stay zero.
pub fn im2col(input: ArrayView4<'_, f32>, window: &Window, out_h: usize, out_w: usize) -> Array2<f32> {
    let (batch, channels, height, width) = input.dim();
    let (kernel_h, kernel_w) = window.kernel;
    let col_h = batch * out_h * out_w;
    let col_w = channels * kernel_h * kernel_w;

    let mut col_matrix = Array2::zeros((col_h, col_w));

    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                let row_idx = b * (out_h * out_w) + oh * out_w + ow;

                for c in 0..channels {
                    let col_base = c * kernel_h * kernel_w;
                    for kh in 0..kernel_h {
                        let ih = (oh * window.stride.0 + kh).wrapping_sub(window.padding.0);
                        if ih >= height {
                            continue;
                        }
                        for kw in 0..kernel_w {
                            let iw = (ow * window.stride.1 + kw).wrapping_sub(window.padding.1);
                            if iw < width {
                                col_matrix[[row_idx, col_base + kh * kernel_w + kw]] =
                                    input[[b, c, ih, iw]];
                            }
                        }
                    }
                }
            }
        }
    }

    col_matrix
}

/// Fold a `(batch * out_h * out_w, out_channels)` GEMM result back into NCHW.
pub fn col2nchw(product: &Array2<f32>, batch: usize, out_h: usize, out_w: usize) -> Array4<f32> {
    let out_channels = product.ncols();
    Array4::from_shape_fn((batch, out_channels, out_h, out_w), |(b, f, oh, ow)| {
        product[[b * (out_h * out_w) + oh * out_w + ow, f]]
    })
}
