//! Iterative linear solves on the lazy matmul contract.

use crate::errors::{LazyGpError, Result};
use crate::lazy::{check_rhs, check_square, LazyMatrix};
use linfa::Float;
use linfa_linalg::norm::Norm;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use num_traits::ToPrimitive;

/// Tuning knobs for the conjugate-gradient solver
#[derive(Clone, Debug)]
pub struct CgParams<F: Float> {
    rtol: F,
    max_iters: usize,
    jacobi: bool,
}

impl<F: Float> CgParams<F> {
    /// Default relative residual tolerance
    pub const DEFAULT_RTOL: f64 = 1e-8;
    /// Default iteration cap
    pub const DEFAULT_MAX_ITERS: usize = 500;

    /// Set the relative residual tolerance
    pub fn rtol(mut self, rtol: F) -> Self {
        self.rtol = rtol;
        self
    }

    /// Set the iteration cap
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Enable or disable Jacobi (diagonal) preconditioning
    pub fn jacobi(mut self, jacobi: bool) -> Self {
        self.jacobi = jacobi;
        self
    }
}

impl<F: Float> Default for CgParams<F> {
    fn default() -> Self {
        CgParams {
            rtol: F::cast(Self::DEFAULT_RTOL),
            max_iters: Self::DEFAULT_MAX_ITERS,
            jacobi: true,
        }
    }
}

/// Outcome of a conjugate-gradient solve: the best iterate found together
/// with its convergence status.
///
/// Non-convergence is not fatal by itself: the iterate is still usable at
/// reduced precision and the caller decides how to proceed.
#[derive(Clone, Debug)]
pub struct CgSolution<F: Float> {
    /// Best iterate found
    pub x: Array2<F>,
    /// Iterations performed (max over right-hand-side columns)
    pub iterations: usize,
    /// Worst relative residual norm across columns
    pub residual: F,
    /// Whether every column reached tolerance
    pub converged: bool,
}

impl<F: Float> CgSolution<F> {
    /// Treat non-convergence as fatal, discarding the iterate for a
    /// [`LazyGpError::NonConvergence`]
    pub fn into_converged(self) -> Result<Array2<F>> {
        if self.converged {
            Ok(self.x)
        } else {
            Err(LazyGpError::NonConvergence {
                iterations: self.iterations,
                residual: self.residual.to_f64().unwrap_or(f64::NAN),
            })
        }
    }
}

/// Solve `op · x = rhs` with Jacobi-preconditioned conjugate gradients.
///
/// Only the `matmul` contract of `op` is used, never `evaluate`, so the
/// operator stays lazy throughout. `op` must be square, self-adjoint and
/// positive definite. The iteration stops when the relative residual falls
/// below the configured tolerance; when the iteration cap is reached first,
/// the best iterate is returned with `converged = false` and a warning is
/// logged.
pub fn cg_solve<F: Float>(
    op: &dyn LazyMatrix<F>,
    rhs: ArrayView2<F>,
    params: &CgParams<F>,
) -> Result<CgSolution<F>> {
    check_square(op.shape())?;
    check_rhs(op.shape().1, &rhs)?;

    let inv_diag = if params.jacobi {
        let diag = op.diagonal()?;
        if diag.iter().all(|&v| v > F::zero()) {
            Some(diag.mapv(|v| v.recip()))
        } else {
            debug!("skipping Jacobi preconditioning: non-positive diagonal entries");
            None
        }
    } else {
        None
    };

    let mut x = Array2::zeros(rhs.dim());
    let mut iterations = 0;
    let mut residual = F::zero();
    let mut converged = true;
    for (j, b) in rhs.columns().into_iter().enumerate() {
        let column = cg_column(op, b, inv_diag.as_ref(), params)?;
        x.column_mut(j).assign(&column.x);
        iterations = iterations.max(column.iterations);
        residual = residual.max(column.residual);
        converged &= column.converged;
    }
    if !converged {
        warn!(
            "cg did not converge within {} iterations (relative residual {:e})",
            params.max_iters, residual
        );
    }
    Ok(CgSolution {
        x,
        iterations,
        residual,
        converged,
    })
}

struct CgColumn<F: Float> {
    x: Array1<F>,
    iterations: usize,
    residual: F,
    converged: bool,
}

fn cg_column<F: Float>(
    op: &dyn LazyMatrix<F>,
    b: ArrayView1<F>,
    inv_diag: Option<&Array1<F>>,
    params: &CgParams<F>,
) -> Result<CgColumn<F>> {
    let n = b.len();
    let b_norm = b.norm_l2();
    if b_norm == F::zero() {
        return Ok(CgColumn {
            x: Array1::zeros(n),
            iterations: 0,
            residual: F::zero(),
            converged: true,
        });
    }
    let matvec = |v: &Array1<F>| -> Result<Array1<F>> {
        Ok(op
            .matmul(v.view().insert_axis(Axis(1)))?
            .remove_axis(Axis(1)))
    };
    let precond = |r: &Array1<F>| match inv_diag {
        Some(d) => r * d,
        None => r.clone(),
    };

    let mut x = Array1::<F>::zeros(n);
    let mut r = b.to_owned();
    let z = precond(&r);
    let mut rz = r.dot(&z);
    let mut p = z;
    let mut rel = r.norm_l2() / b_norm;
    let mut best_x = x.clone();
    let mut best_rel = rel;
    let mut converged = rel <= params.rtol;
    let mut it = 0;

    while !converged && it < params.max_iters {
        let ap = matvec(&p)?;
        let pap = p.dot(&ap);
        if pap <= F::zero() {
            warn!("cg hit a non-positive curvature direction, stopping early");
            break;
        }
        let alpha = rz / pap;
        x.scaled_add(alpha, &p);
        r.scaled_add(-alpha, &ap);
        it += 1;
        rel = r.norm_l2() / b_norm;
        if rel < best_rel {
            best_rel = rel;
            best_x = x.clone();
        }
        if rel <= params.rtol {
            converged = true;
            break;
        }
        let z = precond(&r);
        let rz_next = r.dot(&z);
        let beta = rz_next / rz;
        rz = rz_next;
        p *= beta;
        p += &z;
    }
    debug!("cg column finished after {it} iterations, relative residual {best_rel:e}");
    Ok(CgColumn {
        x: best_x,
        iterations: it,
        residual: best_rel,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy::{scale, sum, Diag, IntoLazy, Toeplitz};
    use approx::assert_abs_diff_eq;
    use ndarray::Array;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn spd_op() -> crate::lazy::LazyRef<f64> {
        // diagonally dominant symmetric Toeplitz plus a diagonal shift
        let n = 40;
        let mut column = Array::zeros(n);
        column[0] = 4.;
        column[1] = 1.;
        column[2] = 0.25;
        sum(vec![
            Toeplitz::new(column).unwrap().into_lazy(),
            scale(Diag::new(Array::ones(n)).into_lazy(), 0.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_cg_round_trip() {
        let op = spd_op();
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let rhs = Array::random_using((40, 2), Uniform::new(-1., 1.), &mut rng);
        let sol = cg_solve(op.as_ref(), rhs.view(), &CgParams::default()).unwrap();
        assert!(sol.converged);
        let back = op.matmul(sol.x.view()).unwrap();
        assert_abs_diff_eq!(back, rhs, epsilon = 1e-6);
    }

    #[test]
    fn test_cg_without_preconditioner() {
        let op = spd_op();
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let rhs = Array::random_using((40, 1), Uniform::new(-1., 1.), &mut rng);
        let params = CgParams::default().jacobi(false);
        let sol = cg_solve(op.as_ref(), rhs.view(), &params).unwrap();
        assert!(sol.converged);
        assert_abs_diff_eq!(
            op.matmul(sol.x.view()).unwrap(),
            rhs,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cg_flags_non_convergence() {
        let op = spd_op();
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let rhs = Array::random_using((40, 1), Uniform::new(-1., 1.), &mut rng);
        let params = CgParams::default().max_iters(1).rtol(1e-14);
        let sol = cg_solve(op.as_ref(), rhs.view(), &params).unwrap();
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 1);
        // the best iterate is still returned alongside the flag
        assert!(sol.residual > 0.);
        assert!(matches!(
            sol.into_converged(),
            Err(LazyGpError::NonConvergence { .. })
        ));
    }

    #[test]
    fn test_cg_zero_rhs_is_exact() {
        let op = spd_op();
        let rhs = Array::zeros((40, 1));
        let sol = cg_solve(op.as_ref(), rhs.view(), &CgParams::default()).unwrap();
        assert!(sol.converged);
        assert_eq!(sol.iterations, 0);
        assert_abs_diff_eq!(sol.x, Array::zeros((40, 1)), epsilon = 1e-12);
    }

    #[test]
    fn test_cg_rejects_non_square() {
        let op = crate::lazy::Zero::<f64>::new(3, 4).into_lazy();
        let rhs = Array::zeros((4, 1));
        assert!(matches!(
            cg_solve(op.as_ref(), rhs.view(), &CgParams::default()),
            Err(LazyGpError::ShapeError(_))
        ));
    }
}
