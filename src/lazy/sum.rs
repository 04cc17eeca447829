use super::{check_rhs, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;

/// An ordered sum of same-shape lazy operators.
///
/// Built through [`sum`](super::sum), which flattens nested sums and cancels
/// [`Zero`](super::Zero) operands, so the operand sequence here is always
/// flat and non-trivial. Operand order is preserved: summation order affects
/// floating-point rounding, never mathematical content.
#[derive(Debug, Clone)]
pub struct Sum<F: Float> {
    operands: Vec<LazyRef<F>>,
}

impl<F: Float> Sum<F> {
    pub(crate) fn from_flat(operands: Vec<LazyRef<F>>) -> Self {
        Sum { operands }
    }

    /// The flat operand sequence, in caller order
    pub fn operands(&self) -> &[LazyRef<F>] {
        &self.operands
    }
}

impl<F: Float> LazyMatrix<F> for Sum<F> {
    fn shape(&self) -> (usize, usize) {
        self.operands[0].shape()
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().1, &rhs)?;
        let mut acc = self.operands[0].matmul(rhs)?;
        for op in &self.operands[1..] {
            acc = acc + op.matmul(rhs)?;
        }
        Ok(acc)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().0, &rhs)?;
        let mut acc = self.operands[0].t_matmul(rhs)?;
        for op in &self.operands[1..] {
            acc = acc + op.t_matmul(rhs)?;
        }
        Ok(acc)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let mut acc = self.operands[0].evaluate()?;
        for op in &self.operands[1..] {
            acc = acc + op.evaluate()?;
        }
        Ok(acc)
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        let mut acc = self.operands[0].diagonal()?;
        for op in &self.operands[1..] {
            acc = acc + op.diagonal()?;
        }
        Ok(acc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
