use super::{check_rhs, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array2, ArrayView2};
use std::any::Any;

/// The matrix product `left · right` of two lazy operators.
///
/// `matmul` composes the operand products right to left, so the full product
/// matrix is never formed. Built through [`matmul_of`](super::matmul_of),
/// which validates the inner dimensions and short-circuits
/// [`Zero`](super::Zero) operands.
#[derive(Debug, Clone)]
pub struct Product<F: Float> {
    left: LazyRef<F>,
    right: LazyRef<F>,
}

impl<F: Float> Product<F> {
    pub(crate) fn from_checked(left: LazyRef<F>, right: LazyRef<F>) -> Self {
        Product { left, right }
    }
}

impl<F: Float> LazyMatrix<F> for Product<F> {
    fn shape(&self) -> (usize, usize) {
        (self.left.shape().0, self.right.shape().1)
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().1, &rhs)?;
        let inner = self.right.matmul(rhs)?;
        self.left.matmul(inner.view())
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().0, &rhs)?;
        let inner = self.left.t_matmul(rhs)?;
        self.right.t_matmul(inner.view())
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let right = self.right.evaluate()?;
        self.left.matmul(right.view())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
