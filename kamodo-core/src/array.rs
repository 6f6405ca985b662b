//! N-dimensional `f64` arrays with elementwise broadcasting.

use crate::broadcast::BroadcastPlan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for array construction and broadcasting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrayError {
    #[error("array data length {len} doesn't match shape {shape:?} ({expected} elements)")]
    DataLength {
        len: usize,
        shape: Vec<usize>,
        expected: usize,
    },

    #[error("shapes {lhs:?} and {rhs:?} are not broadcastable (dimension {dim}: {a} vs {b})")]
    ShapeMismatch {
        lhs: Vec<usize>,
        rhs: Vec<usize>,
        dim: usize,
        a: usize,
        b: usize,
    },
}

/// Dense row-major array. A scalar has an empty shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Result<Self, ArrayError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ArrayError::DataLength { len: data.len(), shape, expected });
        }
        Ok(Self { shape, data })
    }

    pub fn scalar(value: f64) -> Self {
        Self { shape: Vec::new(), data: vec![value] }
    }

    /// One-dimensional array
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { shape: vec![data.len()], data }
    }

    /// `n` evenly spaced samples over `[start, stop]`
    pub fn linspace(start: f64, stop: f64, n: usize) -> Self {
        let data = match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (n - 1) as f64;
                (0..n).map(|i| start + step * i as f64).collect()
            }
        };
        Self::from_vec(data)
    }

    pub fn full(shape: Vec<usize>, value: f64) -> Self {
        let len = shape.iter().product();
        Self { shape, data: vec![value; len] }
    }

    /// Build an array by evaluating `f` at every multi-index, in row-major order
    pub fn from_shape_fn(shape: Vec<usize>, f: impl Fn(&[usize]) -> f64) -> Self {
        let len: usize = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut index = vec![0usize; shape.len()];
        for _ in 0..len {
            data.push(f(&index));
            for dim in (0..shape.len()).rev() {
                index[dim] += 1;
                if index[dim] < shape[dim] {
                    break;
                }
                index[dim] = 0;
            }
        }
        Self { shape, data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Element at a multi-index
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &size) in index.iter().zip(&self.shape) {
            if i >= size {
                return None;
            }
            offset = offset * size + i;
        }
        self.data.get(offset).copied()
    }

    /// Same data, new shape
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, ArrayError> {
        Self::new(self.data, shape)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Elementwise binary operation with broadcasting
    pub fn zip_with(&self, other: &Array, f: impl Fn(f64, f64) -> f64) -> Result<Self, ArrayError> {
        if self.shape == other.shape {
            let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
            return Ok(Self { shape: self.shape.clone(), data });
        }

        let plan = BroadcastPlan::new(&self.shape, &other.shape)?;
        let data = plan.iter().map(|(ia, ib)| f(self.data[ia], other.data[ib])).collect();
        Ok(Self { shape: plan.output_shape().to_vec(), data })
    }

    /// Replace NaN entries with `fill_value`
    pub fn fill_nan(self, fill_value: f64) -> Self {
        if fill_value.is_nan() {
            return self;
        }
        Self {
            shape: self.shape,
            data: self.data.into_iter().map(|x| if x.is_nan() { fill_value } else { x }).collect(),
        }
    }
}

impl From<f64> for Array {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for Array {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Array::new(vec![1.0, 2.0, 3.0], vec![2, 2]).is_err());
        let a = Array::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(a.get(&[1, 0]), Some(3.0));
        assert_eq!(a.get(&[2, 0]), None);
    }

    #[test]
    fn test_linspace() {
        let a = Array::linspace(0.0, 1.0, 5);
        assert_eq!(a.shape(), &[5]);
        assert_eq!(a.data(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(Array::linspace(2.0, 3.0, 1).data(), &[2.0]);
    }

    #[test]
    fn test_from_shape_fn_row_major() {
        let a = Array::from_shape_fn(vec![2, 3], |ix| (ix[0] * 10 + ix[1]) as f64);
        assert_eq!(a.data(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_zip_with_scalar() {
        let a = Array::from_vec(vec![1.0, 2.0, 3.0]);
        let b = a.zip_with(&Array::scalar(2.0), |x, y| x * y).unwrap();
        assert_eq!(b.data(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_zip_with_outer() {
        let col = Array::from_vec(vec![1.0, 2.0]).reshape(vec![2, 1]).unwrap();
        let row = Array::from_vec(vec![10.0, 20.0, 30.0]);
        let sum = col.zip_with(&row, |x, y| x + y).unwrap();
        assert_eq!(sum.shape(), &[2, 3]);
        assert_eq!(sum.data(), &[11.0, 21.0, 31.0, 12.0, 22.0, 32.0]);
    }

    #[test]
    fn test_zip_with_mismatch() {
        let a = Array::linspace(0.0, 1.0, 11);
        let b = Array::linspace(0.0, 1.0, 22);
        assert!(matches!(
            a.zip_with(&b, |x, y| x + y),
            Err(ArrayError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_fill_nan() {
        let a = Array::from_vec(vec![1.0, f64::NAN]).fill_nan(-1.0);
        assert_eq!(a.data(), &[1.0, -1.0]);
    }
}
