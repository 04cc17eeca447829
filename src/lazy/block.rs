use super::{check_rhs, check_square, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayView2};
use std::any::Any;

/// A block-diagonal operator over an ordered sequence of same-shape blocks.
///
/// All operations act block-wise, so the cost is the sum of the block costs
/// instead of that of one large operator. This is also how a batch of
/// same-shape covariance blocks is represented structurally.
#[derive(Debug, Clone)]
pub struct BlockDiag<F: Float> {
    blocks: Vec<LazyRef<F>>,
    block_shape: (usize, usize),
}

impl<F: Float> BlockDiag<F> {
    pub(crate) fn from_flat(blocks: Vec<LazyRef<F>>) -> Self {
        let block_shape = blocks[0].shape();
        BlockDiag {
            blocks,
            block_shape,
        }
    }

    /// The diagonal blocks, in order
    pub fn blocks(&self) -> &[LazyRef<F>] {
        &self.blocks
    }
}

impl<F: Float> LazyMatrix<F> for BlockDiag<F> {
    fn shape(&self) -> (usize, usize) {
        let (mb, nb) = self.block_shape;
        (self.blocks.len() * mb, self.blocks.len() * nb)
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        let (mb, nb) = self.block_shape;
        check_rhs(self.shape().1, &rhs)?;
        let mut out = Array2::zeros((self.shape().0, rhs.ncols()));
        for (i, block) in self.blocks.iter().enumerate() {
            let y = block.matmul(rhs.slice(s![i * nb..(i + 1) * nb, ..]))?;
            out.slice_mut(s![i * mb..(i + 1) * mb, ..]).assign(&y);
        }
        Ok(out)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        let (mb, nb) = self.block_shape;
        check_rhs(self.shape().0, &rhs)?;
        let mut out = Array2::zeros((self.shape().1, rhs.ncols()));
        for (i, block) in self.blocks.iter().enumerate() {
            let y = block.t_matmul(rhs.slice(s![i * mb..(i + 1) * mb, ..]))?;
            out.slice_mut(s![i * nb..(i + 1) * nb, ..]).assign(&y);
        }
        Ok(out)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let (mb, nb) = self.block_shape;
        let mut out = Array2::zeros(self.shape());
        for (i, block) in self.blocks.iter().enumerate() {
            out.slice_mut(s![i * mb..(i + 1) * mb, i * nb..(i + 1) * nb])
                .assign(&block.evaluate()?);
        }
        Ok(out)
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        let nb = self.block_shape.0;
        let mut out = Array1::zeros(self.shape().0);
        for (i, block) in self.blocks.iter().enumerate() {
            out.slice_mut(s![i * nb..(i + 1) * nb])
                .assign(&block.diagonal()?);
        }
        Ok(out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
