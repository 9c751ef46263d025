//! Network hyperparameters, read from the training harness's `params.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pooling applied between the final batch norm and the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadPool {
    /// Square average-pooling window with stride equal to its size. The
    /// pooled map must come out 1x1 for the classifier to accept it.
    Window(usize),
    /// Average over whatever spatial extent remains.
    Global,
}

impl Default for HeadPool {
    fn default() -> Self {
        HeadPool::Window(8)
    }
}

/// DenseNet hyperparameters.
///
/// The default head pools an 8x8 window, which only suits 32x32 inputs. For
/// nominal 128x192 images set `head_pool: HeadPool::Global`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub growth_rate: usize,
    pub depth: usize,
    pub reduction: f64,
    #[serde(default = "default_bottleneck")]
    pub bottleneck: bool,
    #[serde(default)]
    pub head_pool: HeadPool,
    /// Seed for weight initialization; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_bottleneck() -> bool {
    true
}

impl Default for Params {
    /// DenseNet-BC (k = 12, L = 100) with half compression.
    fn default() -> Self {
        Self {
            growth_rate: 12,
            depth: 100,
            reduction: 0.5,
            bottleneck: true,
            head_pool: HeadPool::default(),
            seed: None,
        }
    }
}

impl Params {
    /// Parses a JSON object; keys unrelated to the network are ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Params = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth < 4 {
            return Err(Error::InvalidConfig(format!(
                "depth must be at least 4, got {}",
                self.depth
            )));
        }
        if self.growth_rate == 0 {
            return Err(Error::InvalidConfig("growthRate must be positive".to_string()));
        }
        if !(self.reduction > 0.0 && self.reduction <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "reduction must lie in (0, 1], got {}",
                self.reduction
            )));
        }
        if self.head_pool == HeadPool::Window(0) {
            return Err(Error::InvalidConfig("head pooling window must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_harness_params() {
        let json = r#"{
            "learning_rate": 1e-3,
            "batch_size": 32,
            "num_epochs": 10,
            "growthRate": 12,
            "depth": 100,
            "reduction": 0.5,
            "bottleneck": true
        }"#;

        let params = Params::from_json_str(json).unwrap();

        assert_eq!(params, Params::default());
    }

    #[test]
    fn test_optional_fields() {
        let json = r#"{"growthRate": 4, "depth": 10, "reduction": 0.5}"#;
        let params = Params::from_json_str(json).unwrap();
        assert!(params.bottleneck);
        assert_eq!(params.head_pool, HeadPool::Window(8));
        assert_eq!(params.seed, None);

        let json = r#"{"growthRate": 4, "depth": 10, "reduction": 0.5,
                       "bottleneck": false, "headPool": "global", "seed": 7}"#;
        let params = Params::from_json_str(json).unwrap();
        assert!(!params.bottleneck);
        assert_eq!(params.head_pool, HeadPool::Global);
        assert_eq!(params.seed, Some(7));

        let json = r#"{"growthRate": 4, "depth": 10, "reduction": 0.5, "headPool": {"window": 4}}"#;
        let params = Params::from_json_str(json).unwrap();
        assert_eq!(params.head_pool, HeadPool::Window(4));
    }

    #[test]
    fn test_missing_required_field() {
        let json = r#"{"growthRate": 12, "reduction": 0.5}"#;
        assert!(matches!(Params::from_json_str(json), Err(Error::Json(_))));
    }

    #[test]
    fn test_validation() {
        let mut params = Params {
            depth: 3,
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(Error::InvalidConfig(_))));

        params.depth = 40;
        params.reduction = 1.5;
        assert!(params.validate().is_err());

        params.reduction = 0.0;
        assert!(params.validate().is_err());

        params.reduction = 1.0;
        params.growth_rate = 0;
        assert!(params.validate().is_err());

        params.growth_rate = 12;
        params.head_pool = HeadPool::Window(0);
        assert!(params.validate().is_err());
    }
}
