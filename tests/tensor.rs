use multidensenet::Tensor;

#[test]
fn test_tensor_creation_from_vec() {
    let vec = vec![1.0, 2.0, 3.0, 4.0];
    let tensor = Tensor::from_vec(vec.clone(), &[1, 1, 2, 2]).expect("Failed to create tensor");

    assert_eq!(tensor.shape(), &[1, 1, 2, 2]);
    assert_eq!(tensor.ndim(), 4);
    assert_eq!(tensor.to_vec(), vec);
}

#[test]
fn test_tensor_shape_mismatch() {
    let result = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[4]);

    assert!(
        result.is_err(),
        "Should fail when shape doesn't match vector length"
    );
}

#[test]
fn test_tensor_zeros() {
    let tensor = Tensor::zeros(&[3, 2]);

    assert_eq!(tensor.len(), 6);
    assert!(tensor.to_vec().iter().all(|&x| x == 0.0), "All values should be zero");
}

#[test]
fn test_tensor_reshape() {
    let tensor = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])
        .expect("Failed to create tensor");

    let reshaped = tensor.reshape(&[3, 2]).expect("Reshape failed");

    assert_eq!(reshaped.shape(), &[3, 2]);
    assert_eq!(reshaped.to_vec(), tensor.to_vec());
    assert!(tensor.reshape(&[2, 4]).is_err());
}

#[test]
fn test_tensor_empty() {
    let tensor = Tensor::from_vec(vec![], &[0, 10]).expect("Failed to create tensor");

    assert!(tensor.is_empty());
}

#[test]
fn test_tensor_from_shape_fn() {
    let tensor = Tensor::from_shape_fn(&[2, 3], |idx| (idx[0] * 10 + idx[1]) as f32);

    assert_eq!(tensor.to_vec(), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
}

#[test]
fn test_tensor_to_array4() {
    let tensor = Tensor::from_vec((0..8).map(|v| v as f32).collect(), &[2, 1, 2, 2]).unwrap();

    let array = tensor.to_array4().unwrap();

    assert_eq!(array.dim(), (2, 1, 2, 2));
    assert_eq!(array[[1, 0, 1, 0]], 6.0);
    assert!(Tensor::zeros(&[2, 2]).to_array4().is_err());
}
