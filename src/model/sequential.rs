use crate::{
    layers::{Layer, LayerMut},
    Error, Result, Tensor,
};

/// Ordered chain of layers; the output of each feeds the next.
#[derive(Debug)]
pub struct Sequential {
    name: String,
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }

    pub fn add(&mut self, layer: Box<dyn Layer>) {
        self.layers.push(layer);
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    fn wrap(&self, idx: usize, layer: &dyn Layer, e: Error) -> Error {
        match e {
            Error::ShapeMismatch { .. } => e,
            other => Error::Layer(format!(
                "{} layer {} ({}): {}",
                self.name,
                idx,
                layer.name(),
                other
            )),
        }
    }
}

impl Layer for Sequential {
    /// An empty chain is the identity.
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let mut current = input.clone();

        for (idx, layer) in self.layers.iter().enumerate() {
            current = layer
                .forward(&current)
                .map_err(|e| self.wrap(idx, layer.as_ref(), e))?;
        }

        Ok(current)
    }

    fn forward_train(&mut self, input: &Tensor) -> Result<Tensor> {
        let mut current = input.clone();

        for idx in 0..self.layers.len() {
            let result = self.layers[idx].forward_train(&current);
            current = result.map_err(|e| self.wrap(idx, self.layers[idx].as_ref(), e))?;
        }

        Ok(current)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let mut current_shape = input_shape.to_vec();

        for layer in &self.layers {
            current_shape = layer.output_shape(&current_shape)?;
        }

        Ok(current_shape)
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(LayerMut<'_>)) {
        for layer in &mut self.layers {
            layer.visit_mut(f);
        }
    }

    fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Linear;
    use ndarray::array;

    #[test]
    fn test_sequential_forward() {
        let mut model = Sequential::new("test_model");

        let layer1 =
            Linear::with_weights("fc1", array![[1.0, 0.5], [0.5, 1.0]], array![0.0, 0.0]).unwrap();
        let layer2 = Linear::with_weights("fc2", array![[1.0, 1.0]], array![0.0]).unwrap();

        model.add(Box::new(layer1));
        model.add(Box::new(layer2));

        let input = Tensor::from_vec(vec![1.0, 2.0], &[1, 2]).unwrap();
        let output = model.forward(&input).unwrap();

        assert_eq!(output.shape(), &[1, 1]);
        assert_eq!(output.to_vec(), vec![4.5]);
        assert_eq!(model.layer_names(), vec!["fc1", "fc2"]);
        assert_eq!(model.num_parameters(), 6 + 3);
    }

    #[test]
    fn test_empty_sequential_is_identity() {
        let model = Sequential::new("empty");
        let input = Tensor::from_vec(vec![1.0, 2.0], &[1, 2]).unwrap();

        assert_eq!(model.forward(&input).unwrap().to_vec(), vec![1.0, 2.0]);
        assert_eq!(model.output_shape(&[1, 2]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_visit_reaches_every_layer() {
        let mut model = Sequential::new("test_model");
        model.add(Box::new(Linear::new("fc1", 2, 2)));
        model.add(Box::new(Linear::new("fc2", 2, 1)));

        let mut seen = 0;
        model.visit_mut(&mut |layer| {
            if let LayerMut::Linear(_) = layer {
                seen += 1;
            }
        });

        assert_eq!(seen, 2);
    }
}
