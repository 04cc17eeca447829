use super::{check_rhs, check_square, LazyMatrix};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;
use std::marker::PhantomData;

/// The degenerate all-zero operator of a given shape.
///
/// Composition constructors cancel it under summation and let it absorb
/// products; on its own, every operation returns zeros of the right shape.
#[derive(Debug, Clone)]
pub struct Zero<F: Float> {
    m: usize,
    n: usize,
    marker: PhantomData<F>,
}

impl<F: Float> Zero<F> {
    /// Build an `(m, n)` zero operator
    pub fn new(m: usize, n: usize) -> Self {
        Zero {
            m,
            n,
            marker: PhantomData,
        }
    }
}

impl<F: Float> LazyMatrix<F> for Zero<F> {
    fn shape(&self) -> (usize, usize) {
        (self.m, self.n)
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.n, &rhs)?;
        Ok(Array2::zeros((self.m, rhs.ncols())))
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.m, &rhs)?;
        Ok(Array2::zeros((self.n, rhs.ncols())))
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(Array2::zeros((self.m, self.n)))
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        Ok(Array1::zeros(self.n))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
