use super::{check_rhs, check_square, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{s, Array, Array1, Array2, ArrayView1, ArrayView2};
use std::any::Any;

/// The Kronecker product of an ordered sequence of lazy factors.
///
/// The operator shape is the product of the factor shapes. `matmul` applies
/// the mixed-product identity factor by factor, so its cost is proportional
/// to the sum of the factor matmul costs instead of the cost of the full
/// product matrix. Built through [`kron`](super::kron), which flattens
/// nested Kronecker products, so the factor sequence here is always flat.
#[derive(Debug, Clone)]
pub struct KroneckerProduct<F: Float> {
    factors: Vec<LazyRef<F>>,
    shape: (usize, usize),
}

impl<F: Float> KroneckerProduct<F> {
    pub(crate) fn from_flat(factors: Vec<LazyRef<F>>) -> Self {
        let shape = factors
            .iter()
            .fold((1, 1), |(m, n), f| (m * f.shape().0, n * f.shape().1));
        KroneckerProduct { factors, shape }
    }

    /// The flat factor sequence, in caller order
    pub fn factors(&self) -> &[LazyRef<F>] {
        &self.factors
    }

    /// Apply the product to one vector, consuming one factor per pass.
    ///
    /// The vector is viewed as a tensor over the factor modes; each pass
    /// multiplies the trailing mode by its factor and rotates the fresh
    /// output mode to the front, which is exactly the row-major Kronecker
    /// ordering once every factor has been consumed.
    fn apply_vec(&self, x: ArrayView1<F>, trans: bool) -> Result<Array1<F>> {
        let mut v = x.to_owned();
        for f in self.factors.iter().rev() {
            let (fm, fn_) = if trans {
                let (a, b) = f.shape();
                (b, a)
            } else {
                f.shape()
            };
            let rows = v.len() / fn_;
            let mat = v.into_shape((rows, fn_)).unwrap();
            let prod = if trans {
                f.t_matmul(mat.t())?
            } else {
                f.matmul(mat.t())?
            };
            // (fm, rows) flattened row-major puts the new mode in front
            v = Array::from_iter(prod.iter().copied());
        }
        Ok(v)
    }

    fn apply(&self, rhs: ArrayView2<F>, trans: bool) -> Result<Array2<F>> {
        let out_rows = if trans { self.shape.1 } else { self.shape.0 };
        let mut out = Array2::zeros((out_rows, rhs.ncols()));
        for (j, col) in rhs.columns().into_iter().enumerate() {
            let y = self.apply_vec(col, trans)?;
            out.column_mut(j).assign(&y);
        }
        Ok(out)
    }
}

impl<F: Float> LazyMatrix<F> for KroneckerProduct<F> {
    fn shape(&self) -> (usize, usize) {
        self.shape
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape.1, &rhs)?;
        self.apply(rhs, false)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape.0, &rhs)?;
        self.apply(rhs, true)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let mut acc = self.factors[0].evaluate()?;
        for f in &self.factors[1..] {
            acc = kron_dense(&acc, &f.evaluate()?);
        }
        Ok(acc)
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape)?;
        if self.factors.iter().any(|f| f.shape().0 != f.shape().1) {
            // square overall but with rectangular factors: no structural
            // shortcut, fall back on the dense diagonal
            return Ok(self.evaluate()?.diag().to_owned());
        }
        let mut acc = Array1::ones(1);
        for f in &self.factors {
            let fd = f.diagonal()?;
            let mut next = Array1::zeros(acc.len() * fd.len());
            for (i, &ai) in acc.iter().enumerate() {
                next.slice_mut(s![i * fd.len()..(i + 1) * fd.len()])
                    .assign(&(&fd * ai));
            }
            acc = next;
        }
        Ok(acc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dense Kronecker product, used for `evaluate` and as a test reference
pub(crate) fn kron_dense<F: Float>(a: &Array2<F>, b: &Array2<F>) -> Array2<F> {
    let (am, an) = a.dim();
    let (bm, bn) = b.dim();
    let mut out = Array2::zeros((am * bm, an * bn));
    for i in 0..am {
        for j in 0..an {
            out.slice_mut(s![i * bm..(i + 1) * bm, j * bn..(j + 1) * bn])
                .assign(&(b * a[[i, j]]));
        }
    }
    out
}
