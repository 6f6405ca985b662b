//! Broadcasting utilities shared by array arithmetic.
//!
//! Shapes are aligned on their trailing dimensions; a dimension broadcasts
//! when it is equal to the other or equal to 1. The plan operates purely on
//! shape metadata and element strides (row-major), so callers iterate over
//! broadcasted indices without materialising expanded arrays.

use crate::ArrayError;

/// Compute row-major strides for a given shape.
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    let mut stride = 1usize;
    for (dim, &size) in shape.iter().enumerate().rev() {
        strides[dim] = stride;
        stride = stride.saturating_mul(size.max(1));
    }
    strides
}

/// Left-pad a shape with singleton dimensions up to `ndims`.
fn extend_shape(shape: &[usize], ndims: usize) -> Vec<usize> {
    let mut ext = Vec::with_capacity(ndims);
    ext.extend(std::iter::repeat(1).take(ndims.saturating_sub(shape.len())));
    ext.extend_from_slice(shape);
    ext
}

/// Output shape of broadcasting two shapes together.
pub fn broadcast_shape(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>, ArrayError> {
    let ndims = shape_a.len().max(shape_b.len());
    let ext_a = extend_shape(shape_a, ndims);
    let ext_b = extend_shape(shape_b, ndims);

    let mut output_shape = Vec::with_capacity(ndims);
    for dim in 0..ndims {
        let (da, db) = (ext_a[dim], ext_b[dim]);
        if da == db || db == 1 {
            output_shape.push(da);
        } else if da == 1 {
            output_shape.push(db);
        } else {
            return Err(ArrayError::ShapeMismatch {
                lhs: shape_a.to_vec(),
                rhs: shape_b.to_vec(),
                dim,
                a: da,
                b: db,
            });
        }
    }
    Ok(output_shape)
}

/// Broadcast plan describing how two arrays are implicitly expanded.
#[derive(Debug, Clone)]
pub struct BroadcastPlan {
    output_shape: Vec<usize>,
    len: usize,
    advance_a: Vec<usize>,
    advance_b: Vec<usize>,
}

impl BroadcastPlan {
    /// Construct a broadcast plan for two shapes, returning an error when they
    /// cannot be broadcast together.
    pub fn new(shape_a: &[usize], shape_b: &[usize]) -> Result<Self, ArrayError> {
        let output_shape = broadcast_shape(shape_a, shape_b)?;
        let ndims = output_shape.len();

        let ext_a = extend_shape(shape_a, ndims);
        let ext_b = extend_shape(shape_b, ndims);
        let strides_a = compute_strides(&ext_a);
        let strides_b = compute_strides(&ext_b);

        let advance_a = ext_a
            .iter()
            .enumerate()
            .map(|(dim, &size)| if size <= 1 { 0 } else { strides_a[dim] })
            .collect();
        let advance_b = ext_b
            .iter()
            .enumerate()
            .map(|(dim, &size)| if size <= 1 { 0 } else { strides_b[dim] })
            .collect();

        Ok(Self {
            len: output_shape.iter().product(),
            output_shape,
            advance_a,
            advance_b,
        })
    }

    /// Total number of elements produced by the broadcast.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Output shape after broadcasting both operands.
    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    /// Iterator yielding `(index_a, index_b)` pairs in output order.
    pub fn iter(&self) -> BroadcastIter<'_> {
        BroadcastIter {
            plan: self,
            offset: 0,
            index_a: 0,
            index_b: 0,
            coords: vec![0usize; self.output_shape.len()],
        }
    }
}

/// Iterator over broadcast indices.
pub struct BroadcastIter<'a> {
    plan: &'a BroadcastPlan,
    offset: usize,
    index_a: usize,
    index_b: usize,
    coords: Vec<usize>,
}

impl Iterator for BroadcastIter<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.plan.len {
            return None;
        }
        let current = (self.index_a, self.index_b);
        self.offset += 1;
        if self.offset == self.plan.len {
            return Some(current);
        }
        for dim in (0..self.plan.output_shape.len()).rev() {
            self.coords[dim] += 1;
            if self.coords[dim] < self.plan.output_shape[dim] {
                self.index_a += self.plan.advance_a[dim];
                self.index_b += self.plan.advance_b[dim];
                break;
            }
            self.coords[dim] = 0;
            let rewind = self.plan.output_shape[dim].saturating_sub(1);
            self.index_a = self.index_a.saturating_sub(self.plan.advance_a[dim] * rewind);
            self.index_b = self.index_b.saturating_sub(self.plan.advance_b[dim] * rewind);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_same_shape() {
        let plan = BroadcastPlan::new(&[2, 3], &[2, 3]).unwrap();
        assert_eq!(plan.output_shape(), &[2, 3]);
        let indices: Vec<(usize, usize)> = plan.iter().collect();
        assert_eq!(indices, (0..6).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn broadcast_scalar_expansion() {
        let plan = BroadcastPlan::new(&[3], &[]).unwrap();
        assert_eq!(plan.output_shape(), &[3]);
        let indices: Vec<(usize, usize)> = plan.iter().collect();
        assert_eq!(indices, vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn broadcast_column_against_row() {
        // (2, 1) against (3,) gives (2, 3)
        let plan = BroadcastPlan::new(&[2, 1], &[3]).unwrap();
        assert_eq!(plan.output_shape(), &[2, 3]);
        let indices: Vec<(usize, usize)> = plan.iter().collect();
        assert_eq!(
            indices,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn broadcast_mismatch_errors() {
        let err = BroadcastPlan::new(&[11], &[22]).unwrap_err();
        assert!(matches!(err, ArrayError::ShapeMismatch { a: 11, b: 22, .. }));
    }

    #[test]
    fn broadcast_zero_sized_dimension() {
        let plan = BroadcastPlan::new(&[0, 3], &[1, 3]).unwrap();
        assert_eq!(plan.output_shape(), &[0, 3]);
        assert!(plan.is_empty());
        assert_eq!(plan.iter().next(), None);
    }
}
