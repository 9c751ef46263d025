use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use crate::{
    activations::Activation,
    layers::{AvgPool2d, BatchNorm2d, Conv2d, Flatten, Layer, LayerMut, Linear},
    params::{HeadPool, Params},
    Error, Result, Tensor,
};

use super::{
    blocks::{Bottleneck, SingleLayer, Transition},
    init::init_weights,
    sequential::Sequential,
    topology::{ChannelPlan, INPUT_CHANNELS},
};

/// DenseNet for single-channel images producing multi-label logits.
///
/// stem conv, three dense blocks with a transition after the first two,
/// then batch norm, ReLU, pooling and a linear classifier. The output is raw
/// logits; [`crate::loss::loss_fn`] applies the sigmoid implicitly.
#[derive(Debug)]
pub struct DenseNet {
    plan: ChannelPlan,
    num_classes: usize,
    conv1: Conv2d,
    dense1: Sequential,
    trans1: Transition,
    dense2: Sequential,
    trans2: Transition,
    dense3: Sequential,
    bn1: BatchNorm2d,
    pool: AvgPool2d,
    flatten: Flatten,
    fc: Linear,
}

impl DenseNet {
    pub fn new(params: &Params, num_classes: usize) -> Result<Self> {
        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut net = Self::uninitialized(params, num_classes)?;
        init_weights(&mut net, &mut rng);

        info!(
            depth = params.depth,
            growth_rate = params.growth_rate,
            bottleneck = params.bottleneck,
            num_classes,
            parameters = net.num_parameters(),
            "built DenseNet"
        );
        Ok(net)
    }

    /// Builds the topology with zeroed convolution and linear weights.
    pub fn uninitialized(params: &Params, num_classes: usize) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidConfig("num_classes must be positive".to_string()));
        }

        let plan = ChannelPlan::new(params)?;
        debug!(
            layers_per_block = plan.layers_per_block,
            progression = ?plan.progression(),
            "channel plan"
        );

        let pool = match params.head_pool {
            HeadPool::Window(k) => AvgPool2d::new("pool", (k, k), None),
            HeadPool::Global => AvgPool2d::global("pool"),
        };

        Ok(Self {
            conv1: Conv2d::new("conv1", INPUT_CHANNELS, plan.stem_channels, 3, 1),
            dense1: make_dense(&plan, 0),
            trans1: Transition::new(
                "trans1",
                plan.transitions[0].in_channels,
                plan.transitions[0].out_channels,
            ),
            dense2: make_dense(&plan, 1),
            trans2: Transition::new(
                "trans2",
                plan.transitions[1].in_channels,
                plan.transitions[1].out_channels,
            ),
            dense3: make_dense(&plan, 2),
            bn1: BatchNorm2d::new("bn1", plan.head_channels),
            pool,
            flatten: Flatten::new("flatten"),
            fc: Linear::new("fc", plan.head_channels, num_classes),
            plan,
            num_classes,
        })
    }

    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn check_input(&self, input: &Tensor) -> Result<()> {
        let (_, channels, _, _) = input.dims4()?;
        if channels != INPUT_CHANNELS {
            return Err(Error::ShapeMismatch {
                expected: vec![INPUT_CHANNELS],
                actual: vec![channels],
            });
        }
        Ok(())
    }

    pub fn summary(&self, input_shape: &[usize]) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "DenseNet{} (k={}, {} layers/block, {} classes)\n",
            if self.plan.bottleneck { "-BC" } else { "" },
            self.plan.growth_rate,
            self.plan.layers_per_block,
            self.num_classes
        ));
        s.push_str("_________________________________________________________________\n");
        s.push_str("Stage                        Output Shape              Params\n");
        s.push_str("=================================================================\n");

        // stages after a failing one have no known shape
        let mut current_shape = Some(input_shape.to_vec());
        for stage in self.stages() {
            let column = match current_shape.as_deref().map(|shape| stage.output_shape(shape)) {
                Some(Ok(shape)) => {
                    let column = format!("{:?}", shape);
                    current_shape = Some(shape);
                    column
                }
                Some(Err(e)) => {
                    current_shape = None;
                    format!("error: {}", e)
                }
                None => "?".to_string(),
            };
            s.push_str(&format!(
                "{:28} {:25} {}\n",
                stage.name(),
                column,
                stage.num_parameters()
            ));
        }

        s.push_str("=================================================================\n");
        s.push_str(&format!("Total params: {}\n", self.num_parameters()));

        s
    }

    fn stages(&self) -> [&dyn Layer; 10] {
        [
            &self.conv1,
            &self.dense1,
            &self.trans1,
            &self.dense2,
            &self.trans2,
            &self.dense3,
            &self.bn1,
            &self.pool,
            &self.flatten,
            &self.fc,
        ]
    }
}

fn make_dense(plan: &ChannelPlan, block: usize) -> Sequential {
    let mut layers = Sequential::new(format!("dense{}", block + 1));
    for (i, in_channels) in plan.layer_inputs(block).enumerate() {
        let name = format!("dense{}.{}", block + 1, i);
        if plan.bottleneck {
            layers.add(Box::new(Bottleneck::new(name, in_channels, plan.growth_rate)));
        } else {
            layers.add(Box::new(SingleLayer::new(name, in_channels, plan.growth_rate)));
        }
    }
    layers
}

impl Layer for DenseNet {
    /// `(N, 1, H, W)` images to `(N, num_classes)` logits.
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        self.check_input(input)?;

        let out = self.conv1.forward(input)?;
        let out = self.trans1.forward(&self.dense1.forward(&out)?)?;
        let out = self.trans2.forward(&self.dense2.forward(&out)?)?;
        let out = self.dense3.forward(&out)?;

        let mut out = self.bn1.forward(&out)?;
        Activation::ReLU.apply(&mut out);
        let out = self.flatten.forward(&self.pool.forward(&out)?)?;
        self.fc.forward(&out)
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        self.check_input(input)?;

        let out = self.conv1.forward(input)?;
        let out = self.dense1.forward_train(&out)?;
        let out = self.trans1.forward_train(&out)?;
        let out = self.dense2.forward_train(&out)?;
        let out = self.trans2.forward_train(&out)?;
        let out = self.dense3.forward_train(&out)?;

        let mut out = self.bn1.forward_train(&out)?;
        Activation::ReLU.apply(&mut out);
        let out = self.flatten.forward(&self.pool.forward(&out)?)?;
        self.fc.forward(&out)
    }

    fn name(&self) -> &str {
        "densenet"
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        if input_shape.len() != 4 || input_shape[1] != INPUT_CHANNELS {
            return Err(Error::ShapeMismatch {
                expected: vec![INPUT_CHANNELS],
                actual: input_shape.to_vec(),
            });
        }

        let mut shape = input_shape.to_vec();
        for stage in self.stages() {
            shape = stage.output_shape(&shape)?;
        }
        Ok(shape)
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(LayerMut<'_>)) {
        self.conv1.visit_mut(f);
        self.dense1.visit_mut(f);
        self.trans1.visit_mut(f);
        self.dense2.visit_mut(f);
        self.trans2.visit_mut(f);
        self.dense3.visit_mut(f);
        self.bn1.visit_mut(f);
        self.fc.visit_mut(f);
    }

    fn num_parameters(&self) -> usize {
        self.stages().iter().map(|s| s.num_parameters()).sum()
    }
}
