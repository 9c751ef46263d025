use std::collections::BTreeMap;

use ndarray::ArrayD;
use numpy::{PyArray, PyArrayDyn, PyArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::{layers::Layer, metrics, DenseNet as RustDenseNet, Error, Params, Tensor};

fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::ShapeMismatch { .. } | Error::InvalidConfig(_) | Error::Json(_) => {
            PyValueError::new_err(e.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn tensor_from(array: &Bound<'_, PyArrayDyn<f32>>) -> Tensor {
    let data: ArrayD<f32> = array.readonly().as_array().to_owned();
    Tensor::new(data)
}

#[pyclass(name = "DenseNet")]
pub struct PyDenseNet {
    inner: RustDenseNet,
}

#[pymethods]
impl PyDenseNet {
    #[new]
    #[pyo3(signature = (params_json, num_classes))]
    fn new(params_json: &str, num_classes: usize) -> PyResult<Self> {
        let params = Params::from_json_str(params_json).map_err(to_py_err)?;
        let inner = RustDenseNet::new(&params, num_classes).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[pyo3(signature = (input))]
    fn forward<'py>(
        &self,
        py: Python<'py>,
        input: &Bound<'py, PyArrayDyn<f32>>,
    ) -> PyResult<Bound<'py, PyArrayDyn<f32>>> {
        let input_tensor = tensor_from(input);
        let output = py
            .allow_threads(|| self.inner.forward(&input_tensor))
            .map_err(to_py_err)?;
        Ok(PyArray::from_owned_array(py, output.into_data()))
    }

    #[pyo3(signature = (input_shape))]
    fn summary(&self, input_shape: Vec<usize>) -> String {
        self.inner.summary(&input_shape)
    }

    fn num_parameters(&self) -> usize {
        self.inner.num_parameters()
    }

    fn channel_progression(&self) -> Vec<usize> {
        self.inner.plan().progression()
    }

    fn __repr__(&self) -> String {
        format!(
            "<DenseNet k={} layers/block={} classes={}>",
            self.inner.plan().growth_rate,
            self.inner.plan().layers_per_block,
            self.inner.num_classes()
        )
    }
}

#[pyfunction]
fn loss_fn(outputs: &Bound<'_, PyArrayDyn<f32>>, labels: &Bound<'_, PyArrayDyn<f32>>) -> PyResult<f32> {
    crate::loss_fn(&tensor_from(outputs), &tensor_from(labels)).map_err(to_py_err)
}

#[pyfunction]
fn accuracy(outputs: &Bound<'_, PyArrayDyn<f32>>, labels: &Bound<'_, PyArrayDyn<f32>>) -> PyResult<f32> {
    metrics::accuracy(&tensor_from(outputs), &tensor_from(labels)).map_err(to_py_err)
}

#[pyfunction]
fn precision(outputs: &Bound<'_, PyArrayDyn<f32>>, labels: &Bound<'_, PyArrayDyn<f32>>) -> PyResult<f32> {
    metrics::precision(&tensor_from(outputs), &tensor_from(labels)).map_err(to_py_err)
}

#[pyfunction]
fn recall(outputs: &Bound<'_, PyArrayDyn<f32>>, labels: &Bound<'_, PyArrayDyn<f32>>) -> PyResult<f32> {
    metrics::recall(&tensor_from(outputs), &tensor_from(labels)).map_err(to_py_err)
}

/// All registered metrics as a `{name: value}` dict.
#[pyfunction]
#[pyo3(name = "metrics")]
fn evaluate_all(
    outputs: &Bound<'_, PyArrayDyn<f32>>,
    labels: &Bound<'_, PyArrayDyn<f32>>,
) -> PyResult<BTreeMap<&'static str, f32>> {
    metrics::evaluate_all(&tensor_from(outputs), &tensor_from(labels)).map_err(to_py_err)
}

pub fn register_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDenseNet>()?;
    m.add_function(wrap_pyfunction!(loss_fn, m)?)?;
    m.add_function(wrap_pyfunction!(accuracy, m)?)?;
    m.add_function(wrap_pyfunction!(precision, m)?)?;
    m.add_function(wrap_pyfunction!(recall, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_all, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
