use super::{check_rhs, check_square, LazyMatrix};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;

/// A fully materialized operator wrapping a dense array.
///
/// The degenerate end of the lazy family: every structural operation is the
/// plain dense one. Used to lift factorization outputs and small blocks into
/// compositions.
#[derive(Debug, Clone)]
pub struct Dense<F: Float> {
    values: Array2<F>,
}

impl<F: Float> Dense<F> {
    /// Wrap a dense `(m, n)` array
    pub fn new(values: Array2<F>) -> Self {
        Dense { values }
    }
}

impl<F: Float> LazyMatrix<F> for Dense<F> {
    fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.values.ncols(), &rhs)?;
        Ok(self.values.dot(&rhs))
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.values.nrows(), &rhs)?;
        Ok(self.values.t().dot(&rhs))
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(self.values.clone())
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        Ok(self.values.diag().to_owned())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
