//! Closed-form channel bookkeeping for the three-stage DenseNet.
//!
//! Every layer of the network is built from these numbers, so the channel
//! counts seen at runtime are exactly the ones computed here.

use crate::{params::Params, Error, Result};

/// Input images are single-channel.
pub const INPUT_CHANNELS: usize = 1;

/// Intermediate width of a bottleneck layer, in multiples of the growth rate.
pub const BOTTLENECK_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub in_channels: usize,
    pub out_channels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    pub growth_rate: usize,
    pub layers_per_block: usize,
    pub bottleneck: bool,
    pub stem_channels: usize,
    pub blocks: [StagePlan; 3],
    pub transitions: [StagePlan; 2],
    /// Channels entering the final batch norm, and features entering the classifier.
    pub head_channels: usize,
}

impl ChannelPlan {
    pub fn new(params: &Params) -> Result<Self> {
        params.validate()?;

        let growth_rate = params.growth_rate;
        let mut layers_per_block = (params.depth - 4) / 3;
        if params.bottleneck {
            layers_per_block /= 2;
        }

        let stem_channels = 2 * growth_rate;
        let dense = |in_channels: usize| StagePlan {
            in_channels,
            out_channels: in_channels + layers_per_block * growth_rate,
        };
        let compress = |in_channels: usize| -> Result<StagePlan> {
            let out_channels = (in_channels as f64 * params.reduction).floor() as usize;
            if out_channels == 0 {
                return Err(Error::InvalidConfig(format!(
                    "reduction {} compresses {} channels to zero",
                    params.reduction, in_channels
                )));
            }
            Ok(StagePlan {
                in_channels,
                out_channels,
            })
        };

        let block1 = dense(stem_channels);
        let trans1 = compress(block1.out_channels)?;
        let block2 = dense(trans1.out_channels);
        let trans2 = compress(block2.out_channels)?;
        let block3 = dense(trans2.out_channels);

        Ok(Self {
            growth_rate,
            layers_per_block,
            bottleneck: params.bottleneck,
            stem_channels,
            blocks: [block1, block2, block3],
            transitions: [trans1, trans2],
            head_channels: block3.out_channels,
        })
    }

    /// Input channels of every internal layer of dense block `block`.
    pub fn layer_inputs(&self, block: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.blocks[block].in_channels;
        (0..self.layers_per_block).map(move |i| start + i * self.growth_rate)
    }

    /// Channel count after each stage, stem first and head last.
    pub fn progression(&self) -> Vec<usize> {
        vec![
            self.stem_channels,
            self.blocks[0].out_channels,
            self.transitions[0].out_channels,
            self.blocks[1].out_channels,
            self.transitions[1].out_channels,
            self.blocks[2].out_channels,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_densenet_bc_100_12() {
        let plan = ChannelPlan::new(&Params::default()).unwrap();

        assert_eq!(plan.layers_per_block, 16);
        assert_eq!(plan.progression(), vec![24, 216, 108, 300, 150, 342]);
        assert_eq!(plan.head_channels, 342);
    }

    #[test]
    fn test_layer_inputs_grow_by_growth_rate() {
        let plan = ChannelPlan::new(&Params::default()).unwrap();

        let inputs: Vec<usize> = plan.layer_inputs(1).collect();
        assert_eq!(inputs.len(), 16);
        assert_eq!(inputs[0], 108);
        assert_eq!(inputs[15], 108 + 15 * 12);
    }

    #[test]
    fn test_single_layer_variant_is_not_halved() {
        let params = Params {
            depth: 40,
            bottleneck: false,
            reduction: 1.0,
            ..Params::default()
        };
        let plan = ChannelPlan::new(&params).unwrap();

        assert_eq!(plan.layers_per_block, 12);
        assert_eq!(plan.progression(), vec![24, 168, 168, 312, 312, 456]);
    }

    #[test]
    fn test_compression_floors_exact_products() {
        // 80 * 0.7 must floor to 56, not 55
        let params =
            Params::from_json_str(r#"{"growthRate": 10, "depth": 40, "reduction": 0.7}"#).unwrap();
        let plan = ChannelPlan::new(&params).unwrap();

        assert_eq!(plan.layers_per_block, 6);
        assert_eq!(plan.transitions[0].out_channels, 56);
        assert_eq!(plan.progression(), vec![20, 80, 56, 116, 81, 141]);
    }

    #[test]
    fn test_minimal_depth_has_empty_blocks() {
        let params = Params {
            depth: 4,
            ..Params::default()
        };
        let plan = ChannelPlan::new(&params).unwrap();

        assert_eq!(plan.layers_per_block, 0);
        assert_eq!(plan.progression(), vec![24, 24, 12, 12, 6, 6]);
    }

    #[test]
    fn test_reduction_to_zero_channels_is_rejected() {
        let params = Params {
            growth_rate: 1,
            depth: 4,
            reduction: 0.3,
            ..Params::default()
        };

        assert!(matches!(
            ChannelPlan::new(&params),
            Err(Error::InvalidConfig(_))
        ));
    }
}
