//! Tensor types used for vector-valued releases.

use ndarray::{Array1, ArrayD};

/// Scalar type of released values.
pub type Scalar = f64;

/// Dynamic-dimensional tensor.
pub type Tensor = ArrayD<Scalar>;

/// Build a one-dimensional tensor from raw values.
pub fn tensor_from_vec(values: Vec<Scalar>) -> Tensor {
    Array1::from_vec(values).into_dyn()
}

/// Flatten a tensor into a vector in logical order.
pub fn tensor_to_vec(t: &Tensor) -> Vec<Scalar> {
    t.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_conversion_preserves_order() {
        let t = tensor_from_vec(vec![3.0, 1.0, 2.0]);
        assert_eq!(t.ndim(), 1);
        assert_eq!(tensor_to_vec(&t), vec![3.0, 1.0, 2.0]);
    }
}
