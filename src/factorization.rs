//! Root decomposition of lazy operators.

use crate::errors::Result;
use crate::lanczos::{lanczos_tridiag, tridiag_matrix};
use crate::lazy::{check_square, Dense, IntoLazy, LazyMatrix, Root};
use linfa::Float;
use linfa_linalg::cholesky::*;
use log::debug;
use ndarray::Array;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

/// Tuning knobs for root decomposition
#[derive(Clone, Debug)]
pub struct RootParams<F: Float> {
    max_dense: usize,
    rank: usize,
    nugget: F,
    seed: Option<u64>,
}

impl<F: Float> RootParams<F> {
    /// Largest size still densified for an exact Cholesky root
    pub const DEFAULT_MAX_DENSE: usize = 800;
    /// Default rank of the iterative low-rank approximation
    pub const DEFAULT_RANK: usize = 100;

    /// Set the largest size densified for the exact path
    pub fn max_dense(mut self, max_dense: usize) -> Self {
        self.max_dense = max_dense;
        self
    }

    /// Set the rank of the iterative low-rank approximation
    pub fn rank(mut self, rank: usize) -> Self {
        self.rank = rank.max(1);
        self
    }

    /// Set nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.nugget = nugget;
        self
    }

    /// Seed the Lanczos probe generator for reproducible roots
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl<F: Float> Default for RootParams<F> {
    fn default() -> Self {
        RootParams {
            max_dense: Self::DEFAULT_MAX_DENSE,
            rank: Self::DEFAULT_RANK,
            nugget: F::cast(100.0) * F::epsilon(),
            seed: None,
        }
    }
}

/// Decompose a symmetric positive-definite lazy operator into a [`Root`]
/// with `R · Rᵀ ≈ self`.
///
/// Small operators (up to `max_dense`) are evaluated and factored exactly
/// with a nugget-stabilized Cholesky. Larger ones get a Lanczos low-rank
/// approximation of the configured rank, driven through `matmul` only: the
/// projected tridiagonal matrix is factored and lifted back through the
/// Krylov basis.
pub fn root_decomposition<F: Float>(
    op: &dyn LazyMatrix<F>,
    params: &RootParams<F>,
) -> Result<Root<F>> {
    check_square(op.shape())?;
    let n = op.shape().0;
    if n <= params.max_dense {
        let mut k = op.evaluate()?;
        for i in 0..n {
            k[[i, i]] = k[[i, i]] + params.nugget;
        }
        let l = k.cholesky()?;
        debug!("dense cholesky root of size {n}");
        Ok(Root::new(Dense::new(l).into_lazy()))
    } else {
        let mut rng = match params.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let z = Array::random_using(n, Normal::new(0., 1.).unwrap(), &mut rng).mapv(F::cast);
        let (q, alpha, beta) = lanczos_tridiag(op, z.view(), params.rank)?;
        let mut t = tridiag_matrix(&alpha, &beta);
        for i in 0..t.nrows() {
            t[[i, i]] = t[[i, i]] + params.nugget;
        }
        let lt = t.cholesky()?;
        let r = q.dot(&lt);
        debug!("lanczos root of rank {} for size {n}", lt.nrows());
        Ok(Root::new(Dense::new(r).into_lazy()))
    }
}
