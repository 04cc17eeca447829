use super::{check_rhs, LazyMatrix, LazyRef};
use crate::errors::{LazyGpError, Result};
use linfa::Float;
use ndarray::{Array2, ArrayView2};
use std::any::Any;

/// Sparse interpolation weights: each output row is a weighted combination
/// of `q` source rows, held as parallel `(rows, q)` index and weight arrays.
#[derive(Debug, Clone)]
pub struct Interp<F: Float> {
    indices: Array2<usize>,
    weights: Array2<F>,
}

impl<F: Float> Interp<F> {
    /// Pair interpolation indices with their weights
    pub fn new(indices: Array2<usize>, weights: Array2<F>) -> Result<Self> {
        if indices.dim() != weights.dim() {
            return Err(LazyGpError::ShapeError(format!(
                "interpolation indices {:?} and weights {:?} disagree",
                indices.dim(),
                weights.dim()
            )));
        }
        Ok(Interp { indices, weights })
    }

    fn rows(&self) -> usize {
        self.indices.nrows()
    }

    fn max_index(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }

    /// Apply the weights: `(rows, k)` output gathered from a `(source, k)`
    /// operand
    fn gather(&self, t: &Array2<F>) -> Array2<F> {
        let mut out = Array2::zeros((self.rows(), t.ncols()));
        for i in 0..self.rows() {
            for q in 0..self.indices.ncols() {
                out.row_mut(i)
                    .scaled_add(self.weights[[i, q]], &t.row(self.indices[[i, q]]));
            }
        }
        out
    }

    /// Apply the transposed weights: `(source, k)` output scattered from a
    /// `(rows, k)` operand. Duplicate indices accumulate additively.
    fn scatter(&self, x: &ArrayView2<F>, source_rows: usize) -> Array2<F> {
        let mut out = Array2::zeros((source_rows, x.ncols()));
        for i in 0..self.rows() {
            for q in 0..self.indices.ncols() {
                out.row_mut(self.indices[[i, q]])
                    .scaled_add(self.weights[[i, q]], &x.row(i));
            }
        }
        out
    }
}

/// A low-rank operator seen through sparse interpolation:
/// `W_left · base · W_rightᵀ`.
///
/// The base operator lives on a small set of inducing rows/columns and the
/// interpolation weights map those onto the full point sets, so `matmul`
/// costs the base matmul plus two sparse passes rather than anything
/// quadratic in the full size.
#[derive(Debug, Clone)]
pub struct Interpolated<F: Float> {
    base: LazyRef<F>,
    left: Interp<F>,
    right: Interp<F>,
}

impl<F: Float> Interpolated<F> {
    /// Interpolate `base` through left/right index-weight pairs
    pub fn new(base: LazyRef<F>, left: Interp<F>, right: Interp<F>) -> Result<Self> {
        let (bm, bn) = base.shape();
        if left.max_index().is_some_and(|i| i >= bm) {
            return Err(LazyGpError::ShapeError(format!(
                "left interpolation indexes beyond the {bm} base rows"
            )));
        }
        if right.max_index().is_some_and(|i| i >= bn) {
            return Err(LazyGpError::ShapeError(format!(
                "right interpolation indexes beyond the {bn} base columns"
            )));
        }
        Ok(Interpolated { base, left, right })
    }
}

impl<F: Float> LazyMatrix<F> for Interpolated<F> {
    fn shape(&self) -> (usize, usize) {
        (self.left.rows(), self.right.rows())
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().1, &rhs)?;
        let spread = self.right.scatter(&rhs, self.base.shape().1);
        let through = self.base.matmul(spread.view())?;
        Ok(self.left.gather(&through))
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().0, &rhs)?;
        let spread = self.left.scatter(&rhs, self.base.shape().0);
        let through = self.base.t_matmul(spread.view())?;
        Ok(self.right.gather(&through))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
