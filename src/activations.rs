use crate::Tensor;
use ndarray::Zip;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    ReLU,
}

impl Activation {
    pub fn apply(&self, tensor: &mut Tensor) {
        match self {
            Activation::ReLU => {
                Zip::from(tensor.data_mut()).for_each(|x| {
                    *x = x.max(0.0);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu() {
        let mut tensor = Tensor::from_vec(vec![-1.0, 0.0, 1.0, 2.0], &[4]).unwrap();
        Activation::ReLU.apply(&mut tensor);
        assert_eq!(tensor.to_vec(), vec![0.0, 0.0, 1.0, 2.0]);
    }
}
