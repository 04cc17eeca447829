//! Lazy structured covariance matrices.
//!
//! A [`LazyMatrix`] is an `(m, n)` linear operator exposing its structural
//! operations (`matmul`, `evaluate`, `diagonal`, transposition) without
//! forcing the dense matrix into memory. Concrete variants exploit their
//! structure so that `matmul` stays strictly cheaper than the naive dense
//! path whenever possible: a [`KroneckerProduct`] multiplies factor by
//! factor, a [`Toeplitz`] operator walks its generating vector, a
//! [`BlockDiag`] works block-wise.
//!
//! Operators are composed bottom-up into an immutable DAG of shared
//! [`LazyRef`] handles with [`sum`], [`kron`], [`scale`], [`matmul_of`],
//! [`block_diag`] and [`transpose`]; composition never mutates its operands.
//! The constructors normalize as they go: nested sums and Kronecker products
//! of the same kind are flattened into one flat operand sequence, a single
//! operand is returned as-is, and [`Zero`] cancels under summation and
//! absorbs under multiplication.

mod block;
mod dense;
mod diag;
mod interpolated;
mod kernel;
mod kronecker;
mod product;
mod root;
mod scale;
mod sum;
mod toeplitz;
mod transpose;
mod zero;

pub use block::BlockDiag;
pub use dense::Dense;
pub use diag::Diag;
pub use interpolated::{Interp, Interpolated};
pub use kernel::LazyKernel;
pub use kronecker::KroneckerProduct;
pub use product::Product;
pub use root::Root;
pub use scale::ConstantScale;
pub use sum::Sum;
pub use toeplitz::Toeplitz;
pub use transpose::Transpose;
pub use zero::Zero;

use crate::errors::{LazyGpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared handle to a lazy matrix, the node type of composition DAGs
pub type LazyRef<F> = Arc<dyn LazyMatrix<F>>;

/// An `(m, n)` linear operator evaluated structurally.
///
/// Every implementation must produce `matmul` results numerically identical,
/// within floating tolerance, to `evaluate()?.dot(rhs)`; the default methods
/// provide the dense fallback path and variants override them whenever their
/// structure gives a cheaper route.
pub trait LazyMatrix<F: Float>: fmt::Debug + Send + Sync {
    /// Operator dimensions `(m, n)`
    fn shape(&self) -> (usize, usize);

    /// Compute `self · rhs` for an `(n, k)` right-hand side
    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>>;

    /// Compute `selfᵀ · rhs` for an `(m, k)` right-hand side
    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().0, &rhs)?;
        Ok(self.evaluate()?.t().dot(&rhs))
    }

    /// Materialize the operator as a dense `(m, n)` array
    fn evaluate(&self) -> Result<Array2<F>> {
        let (_, n) = self.shape();
        self.matmul(Array2::eye(n).view())
    }

    /// Extract the diagonal of a square operator
    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        Ok(self.evaluate()?.diag().to_owned())
    }

    /// Downcast support used by the composition constructors
    fn as_any(&self) -> &dyn Any;
}

/// Move a concrete variant behind a shared [`LazyRef`] handle
pub trait IntoLazy<F: Float> {
    /// Wrap `self` into an `Arc<dyn LazyMatrix>`
    fn into_lazy(self) -> LazyRef<F>;
}

impl<F: Float, M: LazyMatrix<F> + 'static> IntoLazy<F> for M {
    fn into_lazy(self) -> LazyRef<F> {
        Arc::new(self)
    }
}

pub(crate) fn check_rhs<F: Float>(n: usize, rhs: &ArrayView2<F>) -> Result<()> {
    if rhs.nrows() != n {
        return Err(LazyGpError::ShapeError(format!(
            "matmul rhs has {} rows, operator expects {}",
            rhs.nrows(),
            n
        )));
    }
    Ok(())
}

pub(crate) fn check_square(shape: (usize, usize)) -> Result<()> {
    if shape.0 != shape.1 {
        return Err(LazyGpError::ShapeError(format!(
            "operation requires a square operator, got ({}, {})",
            shape.0, shape.1
        )));
    }
    Ok(())
}

fn is_zero<F: Float>(op: &LazyRef<F>) -> bool {
    op.as_any().downcast_ref::<Zero<F>>().is_some()
}

/// Sum lazy operators of identical shape.
///
/// Nested sums are flattened into one flat operand sequence and [`Zero`]
/// operands cancel. A single surviving operand is returned unchanged; a sum
/// that cancels entirely is [`Zero`]. Caller operand order is preserved.
pub fn sum<F: Float>(operands: Vec<LazyRef<F>>) -> Result<LazyRef<F>> {
    let shape = operands
        .first()
        .ok_or_else(|| LazyGpError::DataError("sum of no operands".to_string()))?
        .shape();
    let mut flat: Vec<LazyRef<F>> = Vec::with_capacity(operands.len());
    for op in operands {
        if op.shape() != shape {
            return Err(LazyGpError::ShapeError(format!(
                "sum operand of shape {:?} differs from {:?}",
                op.shape(),
                shape
            )));
        }
        if is_zero(&op) {
            continue;
        }
        match op.as_any().downcast_ref::<Sum<F>>() {
            Some(inner) => flat.extend(inner.operands().iter().cloned()),
            None => flat.push(op),
        }
    }
    Ok(match flat.len() {
        0 => Zero::new(shape.0, shape.1).into_lazy(),
        1 => flat.pop().unwrap(),
        _ => Sum::from_flat(flat).into_lazy(),
    })
}

/// Kronecker-multiply lazy factors; the result shape is the product of the
/// factor shapes.
///
/// Nested Kronecker products are flattened into one flat factor sequence,
/// preserving order. A [`Zero`] factor makes the whole product [`Zero`]; a
/// single factor is returned unchanged.
pub fn kron<F: Float>(factors: Vec<LazyRef<F>>) -> Result<LazyRef<F>> {
    if factors.is_empty() {
        return Err(LazyGpError::DataError(
            "kronecker product of no factors".to_string(),
        ));
    }
    let mut flat: Vec<LazyRef<F>> = Vec::with_capacity(factors.len());
    for op in factors {
        match op.as_any().downcast_ref::<KroneckerProduct<F>>() {
            Some(inner) => flat.extend(inner.factors().iter().cloned()),
            None => flat.push(op),
        }
    }
    let (m, n) = flat
        .iter()
        .fold((1, 1), |(m, n), f| (m * f.shape().0, n * f.shape().1));
    if flat.iter().any(is_zero) {
        return Ok(Zero::new(m, n).into_lazy());
    }
    Ok(match flat.len() {
        1 => flat.pop().unwrap(),
        _ => KroneckerProduct::from_flat(flat).into_lazy(),
    })
}

/// Scale a lazy operator by a constant.
///
/// Scaling [`Zero`] (or scaling by zero) stays [`Zero`]; scaling a
/// [`ConstantScale`] collapses both scalars into one wrapper.
pub fn scale<F: Float>(op: LazyRef<F>, c: F) -> LazyRef<F> {
    if is_zero(&op) {
        return op;
    }
    if c == F::zero() {
        let (m, n) = op.shape();
        return Zero::new(m, n).into_lazy();
    }
    if let Some(inner) = op.as_any().downcast_ref::<ConstantScale<F>>() {
        return ConstantScale::new(inner.operand().clone(), c * inner.constant()).into_lazy();
    }
    ConstantScale::new(op, c).into_lazy()
}

/// Compose two lazy operators as the matrix product `a · b`.
///
/// A [`Zero`] operand absorbs: the product is [`Zero`] of the composite
/// shape.
pub fn matmul_of<F: Float>(a: LazyRef<F>, b: LazyRef<F>) -> Result<LazyRef<F>> {
    let (am, an) = a.shape();
    let (bm, bn) = b.shape();
    if an != bm {
        return Err(LazyGpError::ShapeError(format!(
            "cannot compose ({am}, {an}) with ({bm}, {bn})"
        )));
    }
    if is_zero(&a) || is_zero(&b) {
        return Ok(Zero::new(am, bn).into_lazy());
    }
    Ok(Product::from_checked(a, b).into_lazy())
}

/// Stack same-shape blocks along the diagonal of a block-diagonal operator
pub fn block_diag<F: Float>(blocks: Vec<LazyRef<F>>) -> Result<LazyRef<F>> {
    let shape = blocks
        .first()
        .ok_or_else(|| LazyGpError::DataError("block-diagonal of no blocks".to_string()))?
        .shape();
    for b in &blocks {
        if b.shape() != shape {
            return Err(LazyGpError::ShapeError(format!(
                "block of shape {:?} differs from {:?}",
                b.shape(),
                shape
            )));
        }
    }
    Ok(if blocks.len() == 1 {
        blocks.into_iter().next().unwrap()
    } else {
        BlockDiag::from_flat(blocks).into_lazy()
    })
}

/// Transpose a lazy operator without evaluating it.
///
/// Transposing a [`Transpose`] unwraps to the original operand.
pub fn transpose<F: Float>(op: LazyRef<F>) -> LazyRef<F> {
    if let Some(inner) = op.as_any().downcast_ref::<Transpose<F>>() {
        return inner.operand().clone();
    }
    Transpose::new(op).into_lazy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::SquaredExponentialKernel;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, Array2};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use paste::paste;
    use rand_xoshiro::Xoshiro256Plus;

    fn rand_mat(m: usize, n: usize, seed: u64) -> Array2<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        Array::random_using((m, n), Uniform::new(-1., 1.), &mut rng)
    }

    fn sum_op() -> LazyRef<f64> {
        sum(vec![
            Dense::new(rand_mat(3, 3, 1)).into_lazy(),
            Diag::new(array![1., 2., 3.]).into_lazy(),
        ])
        .unwrap()
    }

    fn interp_op() -> LazyRef<f64> {
        let base = Dense::new(rand_mat(3, 3, 5)).into_lazy();
        let left = Interp::new(array![[0, 1], [1, 2], [2, 2], [0, 0]], rand_mat(4, 2, 6)).unwrap();
        let right = Interp::new(array![[2, 0], [1, 1], [0, 2], [1, 0]], rand_mat(4, 2, 7)).unwrap();
        Interpolated::new(base, left, right).unwrap().into_lazy()
    }

    fn kernel_op() -> LazyRef<f64> {
        let x = rand_mat(5, 2, 8);
        let kernel = Arc::new(SquaredExponentialKernel::new(array![0.5, 1.5]));
        LazyKernel::new(kernel, x.clone(), x).unwrap().into_lazy()
    }

    // Structural-equivalence laws: every variant must agree with its own
    // dense evaluation on matmul, transposed matmul and diagonal extraction.
    macro_rules! test_structural_laws {
        ($name:ident, $build:expr) => {
            paste! {
                #[test]
                fn [<test_ $name _matmul_matches_evaluate>]() {
                    let op = $build;
                    let (_, n) = op.shape();
                    let rhs = rand_mat(n, 3, 99);
                    let expected = op.evaluate().unwrap().dot(&rhs);
                    assert_abs_diff_eq!(op.matmul(rhs.view()).unwrap(), expected, epsilon = 1e-10);
                }

                #[test]
                fn [<test_ $name _t_matmul_matches_evaluate>]() {
                    let op = $build;
                    let (m, _) = op.shape();
                    let rhs = rand_mat(m, 2, 100);
                    let expected = op.evaluate().unwrap().t().dot(&rhs);
                    assert_abs_diff_eq!(op.t_matmul(rhs.view()).unwrap(), expected, epsilon = 1e-10);
                }

                #[test]
                fn [<test_ $name _diagonal_matches_evaluate>]() {
                    let op = $build;
                    let (m, n) = op.shape();
                    if m == n {
                        let expected = op.evaluate().unwrap().diag().to_owned();
                        assert_abs_diff_eq!(op.diagonal().unwrap(), expected, epsilon = 1e-10);
                    } else {
                        assert!(op.diagonal().is_err());
                    }
                }
            }
        };
    }

    test_structural_laws!(dense, Dense::new(rand_mat(4, 4, 1)).into_lazy());
    test_structural_laws!(diag, Diag::new(array![1., -2., 3.]).into_lazy());
    test_structural_laws!(zero, Zero::<f64>::new(3, 5).into_lazy());
    test_structural_laws!(scale, scale(Diag::new(array![1., 2., 3.]).into_lazy(), 2.5));
    test_structural_laws!(sum, sum_op());
    test_structural_laws!(
        product,
        matmul_of(
            Dense::new(rand_mat(3, 4, 2)).into_lazy(),
            Dense::new(rand_mat(4, 2, 3)).into_lazy()
        )
        .unwrap()
    );
    test_structural_laws!(
        kron,
        kron(vec![
            Dense::new(rand_mat(2, 3, 4)).into_lazy(),
            Diag::new(array![1., 2.]).into_lazy(),
            Dense::new(rand_mat(2, 2, 5)).into_lazy(),
        ])
        .unwrap()
    );
    test_structural_laws!(
        toeplitz,
        Toeplitz::new(array![4., 1., 0.5, 0.]).unwrap().into_lazy()
    );
    test_structural_laws!(
        block,
        block_diag(vec![
            Dense::new(rand_mat(2, 2, 6)).into_lazy(),
            Dense::new(rand_mat(2, 2, 7)).into_lazy(),
            Dense::new(rand_mat(2, 2, 8)).into_lazy(),
        ])
        .unwrap()
    );
    test_structural_laws!(interpolated, interp_op());
    test_structural_laws!(
        root,
        Root::new(Dense::new(rand_mat(4, 2, 9)).into_lazy()).into_lazy()
    );
    test_structural_laws!(
        transpose,
        transpose(Dense::new(rand_mat(3, 4, 10)).into_lazy())
    );
    test_structural_laws!(lazy_kernel, kernel_op());

    #[test]
    fn test_nested_sums_flatten() {
        let a = Diag::new(array![1., 2.]).into_lazy();
        let b = Diag::new(array![3., 4.]).into_lazy();
        let c = Diag::new(array![5., 6.]).into_lazy();
        let inner = sum(vec![a, b]).unwrap();
        let outer = sum(vec![inner, c]).unwrap();
        let flat = outer.as_any().downcast_ref::<Sum<f64>>().unwrap();
        assert_eq!(flat.operands().len(), 3);
        assert_abs_diff_eq!(
            outer.evaluate().unwrap(),
            Array2::from_diag(&array![9., 12.]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_operand_sum_is_operand() {
        let a = Diag::new(array![1., 2.]).into_lazy();
        let s = sum(vec![a.clone()]).unwrap();
        assert!(Arc::ptr_eq(&a, &s));
    }

    #[test]
    fn test_zero_cancels_under_sum() {
        let x = Dense::new(rand_mat(3, 3, 11)).into_lazy();
        let z = Zero::new(3, 3).into_lazy();
        let s = sum(vec![z, x.clone()]).unwrap();
        // exact equality, not approximate: the operand survives unchanged
        assert_eq!(s.evaluate().unwrap(), x.evaluate().unwrap());
    }

    #[test]
    fn test_sum_of_zeros_is_zero() {
        let s = sum(vec![
            Zero::<f64>::new(2, 3).into_lazy(),
            Zero::new(2, 3).into_lazy(),
        ])
        .unwrap();
        assert!(s.as_any().downcast_ref::<Zero<f64>>().is_some());
        assert_eq!(s.shape(), (2, 3));
    }

    #[test]
    fn test_sum_shape_mismatch() {
        let res = sum(vec![
            Diag::new(array![1., 2.]).into_lazy(),
            Diag::new(array![1., 2., 3.]).into_lazy(),
        ]);
        assert!(matches!(res, Err(LazyGpError::ShapeError(_))));
    }

    #[test]
    fn test_sum_order_only_affects_rounding() {
        let a = Dense::new(rand_mat(4, 4, 12)).into_lazy();
        let b = Dense::new(rand_mat(4, 4, 13)).into_lazy();
        let c = Diag::new(array![0.1, 0.2, 0.3, 0.4]).into_lazy();
        let rhs = rand_mat(4, 2, 14);
        let lhs = sum(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let rhs_op = sum(vec![c, a, b]).unwrap();
        assert_abs_diff_eq!(
            lhs.matmul(rhs.view()).unwrap(),
            rhs_op.matmul(rhs.view()).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_kron_zero_factor_is_zero() {
        let k = kron(vec![
            Dense::new(rand_mat(2, 3, 15)).into_lazy(),
            Zero::new(4, 5).into_lazy(),
        ])
        .unwrap();
        assert!(k.as_any().downcast_ref::<Zero<f64>>().is_some());
        assert_eq!(k.shape(), (8, 15));
    }

    #[test]
    fn test_nested_krons_flatten() {
        let a = Diag::new(array![1., 2.]).into_lazy();
        let b = Diag::new(array![3., 4.]).into_lazy();
        let c = Diag::new(array![5., 6.]).into_lazy();
        let inner = kron(vec![a, b]).unwrap();
        let outer = kron(vec![inner, c]).unwrap();
        let flat = outer.as_any().downcast_ref::<KroneckerProduct<f64>>().unwrap();
        assert_eq!(flat.factors().len(), 3);
        assert_eq!(outer.shape(), (8, 8));
    }

    #[test]
    fn test_matmul_of_zero_absorbs() {
        let a = Dense::new(rand_mat(3, 4, 16)).into_lazy();
        let z = Zero::new(4, 2).into_lazy();
        let p = matmul_of(a, z).unwrap();
        assert!(p.as_any().downcast_ref::<Zero<f64>>().is_some());
        assert_eq!(p.shape(), (3, 2));
    }

    #[test]
    fn test_scale_collapses() {
        let d = Diag::new(array![1., 2.]).into_lazy();
        let s = scale(scale(d, 2.), 3.);
        let cs = s.as_any().downcast_ref::<ConstantScale<f64>>().unwrap();
        assert_abs_diff_eq!(cs.constant(), 6., epsilon = 1e-12);
    }

    #[test]
    fn test_double_transpose_unwraps() {
        let a = Dense::new(rand_mat(3, 4, 17)).into_lazy();
        let tt = transpose(transpose(a.clone()));
        assert!(Arc::ptr_eq(&a, &tt));
    }

    #[test]
    fn test_matmul_rhs_shape_checked() {
        let d = Diag::new(array![1., 2., 3.]).into_lazy();
        let rhs = rand_mat(4, 2, 18);
        assert!(matches!(
            d.matmul(rhs.view()),
            Err(LazyGpError::ShapeError(_))
        ));
    }

    #[test]
    fn test_scaled_diag_sum_scenario() {
        let s = sum(vec![
            Diag::new(array![1., 1.]).into_lazy(),
            scale(Diag::new(array![1., 1.]).into_lazy(), 2.0),
        ])
        .unwrap();
        assert_abs_diff_eq!(
            s.evaluate().unwrap(),
            array![[3., 0.], [0., 3.]],
            epsilon = 1e-12
        );
    }
}
