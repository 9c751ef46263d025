//! # multidensenet
//!
//! A DenseNet-BC classifier for single-channel images with multi-label
//! outputs, its sigmoid cross-entropy loss and batch-level metrics.
//! Training loops, data loading and optimizers live in the caller; parameters
//! are reachable through [`layers::Layer::visit_mut`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use multidensenet::{layers::Layer, loss_fn, metrics, DenseNet, Params};
//!
//! let params = Params::from_json_file("params.json")?;
//! let net = DenseNet::new(&params, 10)?;
//! let logits = net.forward(&images)?;
//! let loss = loss_fn(&logits, &labels)?;
//! let scores = metrics::evaluate_all(&logits, &labels)?;
//! ```

pub mod activations;
mod conv2d_impl;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod params;
pub mod tensor;

#[cfg(feature = "python")]
pub mod python;

pub use error::{Error, Result};
pub use loss::loss_fn;
pub use metrics::{accuracy, precision, recall, Metric};
pub use model::DenseNet;
pub use params::{HeadPool, Params};
pub use tensor::Tensor;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn multidensenet(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register_module(m)?;
    Ok(())
}
