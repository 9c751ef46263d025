//! Dense-block internal layers and the transition between blocks.

use crate::{
    activations::Activation,
    layers::{AvgPool2d, BatchNorm2d, Conv2d, Layer, LayerMut},
    Error, Result, Tensor,
};

use super::topology::BOTTLENECK_WIDTH;

/// `conv(relu(bn(x)))`, in either inference or training mode.
fn bn_relu_conv(bn: &BatchNorm2d, conv: &Conv2d, input: &Tensor) -> Result<Tensor> {
    let mut out = bn.forward(input)?;
    Activation::ReLU.apply(&mut out);
    conv.forward(&out)
}

fn bn_relu_conv_train(bn: &mut BatchNorm2d, conv: &Conv2d, input: &Tensor) -> Result<Tensor> {
    let mut out = bn.forward_train(input)?;
    Activation::ReLU.apply(&mut out);
    conv.forward(&out)
}

fn concat_shape(input_shape: &[usize], appended: &[usize]) -> Result<Vec<usize>> {
    match (input_shape, appended) {
        ([n, c, h, w], [_, g, _, _]) => Ok(vec![*n, c + g, *h, *w]),
        _ => Err(Error::Layer(format!(
            "dense layer expects 4D input, got {:?}",
            input_shape
        ))),
    }
}

/// BN-ReLU-Conv1x1 to `4k` channels, then BN-ReLU-Conv3x3 to `k`, concatenated
/// onto the input.
#[derive(Debug, Clone)]
pub struct Bottleneck {
    name: String,
    bn1: BatchNorm2d,
    conv1: Conv2d,
    bn2: BatchNorm2d,
    conv2: Conv2d,
}

impl Bottleneck {
    pub fn new(name: impl Into<String>, in_channels: usize, growth_rate: usize) -> Self {
        let name = name.into();
        let inter_channels = BOTTLENECK_WIDTH * growth_rate;
        Self {
            bn1: BatchNorm2d::new(format!("{}.bn1", name), in_channels),
            conv1: Conv2d::new(format!("{}.conv1", name), in_channels, inter_channels, 1, 0),
            bn2: BatchNorm2d::new(format!("{}.bn2", name), inter_channels),
            conv2: Conv2d::new(format!("{}.conv2", name), inter_channels, growth_rate, 3, 1),
            name,
        }
    }
}

impl Layer for Bottleneck {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv(&self.bn1, &self.conv1, input)?;
        let out = bn_relu_conv(&self.bn2, &self.conv2, &out)?;
        input.concat_channels(&out)
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv_train(&mut self.bn1, &self.conv1, input)?;
        let out = bn_relu_conv_train(&mut self.bn2, &self.conv2, &out)?;
        input.concat_channels(&out)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.bn1.output_shape(input_shape)?;
        let shape = self.conv1.output_shape(&shape)?;
        let shape = self.bn2.output_shape(&shape)?;
        let shape = self.conv2.output_shape(&shape)?;
        concat_shape(input_shape, &shape)
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(LayerMut<'_>)) {
        self.bn1.visit_mut(f);
        self.conv1.visit_mut(f);
        self.bn2.visit_mut(f);
        self.conv2.visit_mut(f);
    }

    fn num_parameters(&self) -> usize {
        self.bn1.num_parameters()
            + self.conv1.num_parameters()
            + self.bn2.num_parameters()
            + self.conv2.num_parameters()
    }
}

/// BN-ReLU-Conv3x3 to `k` channels, concatenated onto the input.
#[derive(Debug, Clone)]
pub struct SingleLayer {
    name: String,
    bn1: BatchNorm2d,
    conv1: Conv2d,
}

impl SingleLayer {
    pub fn new(name: impl Into<String>, in_channels: usize, growth_rate: usize) -> Self {
        let name = name.into();
        Self {
            bn1: BatchNorm2d::new(format!("{}.bn1", name), in_channels),
            conv1: Conv2d::new(format!("{}.conv1", name), in_channels, growth_rate, 3, 1),
            name,
        }
    }
}

impl Layer for SingleLayer {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv(&self.bn1, &self.conv1, input)?;
        input.concat_channels(&out)
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv_train(&mut self.bn1, &self.conv1, input)?;
        input.concat_channels(&out)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.bn1.output_shape(input_shape)?;
        let shape = self.conv1.output_shape(&shape)?;
        concat_shape(input_shape, &shape)
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(LayerMut<'_>)) {
        self.bn1.visit_mut(f);
        self.conv1.visit_mut(f);
    }

    fn num_parameters(&self) -> usize {
        self.bn1.num_parameters() + self.conv1.num_parameters()
    }
}

/// BN-ReLU-Conv1x1 compression followed by 2x2 average pooling.
#[derive(Debug, Clone)]
pub struct Transition {
    name: String,
    bn1: BatchNorm2d,
    conv1: Conv2d,
    pool: AvgPool2d,
}

impl Transition {
    pub fn new(name: impl Into<String>, in_channels: usize, out_channels: usize) -> Self {
        let name = name.into();
        Self {
            bn1: BatchNorm2d::new(format!("{}.bn1", name), in_channels),
            conv1: Conv2d::new(format!("{}.conv1", name), in_channels, out_channels, 1, 0),
            pool: AvgPool2d::new(format!("{}.pool", name), (2, 2), None),
            name,
        }
    }
}

impl Layer for Transition {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv(&self.bn1, &self.conv1, input)?;
        self.pool.forward(&out)
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = bn_relu_conv_train(&mut self.bn1, &self.conv1, input)?;
        self.pool.forward(&out)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.bn1.output_shape(input_shape)?;
        let shape = self.conv1.output_shape(&shape)?;
        self.pool.output_shape(&shape)
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(LayerMut<'_>)) {
        self.bn1.visit_mut(f);
        self.conv1.visit_mut(f);
    }

    fn num_parameters(&self) -> usize {
        self.bn1.num_parameters() + self.conv1.num_parameters()
    }
}
