use super::{check_square, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;

/// A lightweight transpose wrapper.
///
/// Swaps the roles of `matmul` and `t_matmul` and of the two dimensions;
/// the operand is never evaluated on the wrapper's account.
#[derive(Debug, Clone)]
pub struct Transpose<F: Float> {
    operand: LazyRef<F>,
}

impl<F: Float> Transpose<F> {
    pub(crate) fn new(operand: LazyRef<F>) -> Self {
        Transpose { operand }
    }

    /// The wrapped operand
    pub fn operand(&self) -> &LazyRef<F> {
        &self.operand
    }
}

impl<F: Float> LazyMatrix<F> for Transpose<F> {
    fn shape(&self) -> (usize, usize) {
        let (m, n) = self.operand.shape();
        (n, m)
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        self.operand.t_matmul(rhs)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        self.operand.matmul(rhs)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(self.operand.evaluate()?.reversed_axes())
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        self.operand.diagonal()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
