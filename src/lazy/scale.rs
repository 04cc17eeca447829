use super::{LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;

/// A lazy operator scaled by a constant
#[derive(Debug, Clone)]
pub struct ConstantScale<F: Float> {
    operand: LazyRef<F>,
    constant: F,
}

impl<F: Float> ConstantScale<F> {
    /// Wrap `operand` scaled by `constant`
    pub fn new(operand: LazyRef<F>, constant: F) -> Self {
        ConstantScale { operand, constant }
    }

    /// The wrapped operand
    pub fn operand(&self) -> &LazyRef<F> {
        &self.operand
    }

    /// The scaling constant
    pub fn constant(&self) -> F {
        self.constant
    }
}

impl<F: Float> LazyMatrix<F> for ConstantScale<F> {
    fn shape(&self) -> (usize, usize) {
        self.operand.shape()
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        Ok(self.operand.matmul(rhs)? * self.constant)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        Ok(self.operand.t_matmul(rhs)? * self.constant)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(self.operand.evaluate()? * self.constant)
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        Ok(self.operand.diagonal()? * self.constant)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
