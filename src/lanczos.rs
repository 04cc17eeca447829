use crate::errors::{LazyGpError, Result};
use crate::lazy::LazyMatrix;
use linfa::Float;
use linfa_linalg::norm::Norm;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};

/// Lanczos tridiagonalization of a square symmetric operator, driven only
/// through `matmul`.
///
/// Returns `(q, alpha, beta)`: an orthonormal basis `(n, k)`, the diagonal
/// `(k)` and the off-diagonal `(k - 1)` of the projected tridiagonal matrix,
/// with `k <= steps`. The recurrence keeps full reorthogonalization against
/// the basis built so far and stops early when the Krylov space becomes
/// invariant (breakdown).
pub(crate) fn lanczos_tridiag<F: Float>(
    op: &dyn LazyMatrix<F>,
    init: ArrayView1<F>,
    steps: usize,
) -> Result<(Array2<F>, Array1<F>, Array1<F>)> {
    let n = op.shape().0;
    let steps = steps.max(1).min(n.max(1));
    let norm0 = init.norm_l2();
    if norm0 == F::zero() {
        return Err(LazyGpError::DataError(
            "zero Lanczos probe vector".to_string(),
        ));
    }
    let breakdown = F::epsilon().sqrt();

    let mut q = Array2::<F>::zeros((n, steps));
    let mut alphas: Vec<F> = Vec::with_capacity(steps);
    let mut betas: Vec<F> = Vec::new();
    let mut v = init.mapv(|x| x / norm0);
    let mut v_prev = Array1::<F>::zeros(n);
    let mut beta_prev = F::zero();
    let mut k = 0;

    while k < steps {
        q.column_mut(k).assign(&v);
        let mut w = op
            .matmul(v.view().insert_axis(Axis(1)))?
            .remove_axis(Axis(1));
        let alpha = v.dot(&w);
        w = w - &v * alpha - &v_prev * beta_prev;
        // full reorthogonalization against the basis built so far
        for j in 0..=k {
            let qj = q.column(j);
            let proj = qj.dot(&w);
            w.scaled_add(-proj, &qj);
        }
        alphas.push(alpha);
        k += 1;
        if k == steps {
            break;
        }
        let beta = w.norm_l2();
        if beta < breakdown {
            break;
        }
        betas.push(beta);
        v_prev = q.column(k - 1).to_owned();
        beta_prev = beta;
        v = w.mapv(|x| x / beta);
    }

    Ok((
        q.slice(s![.., ..k]).to_owned(),
        Array1::from(alphas),
        Array1::from(betas),
    ))
}

/// Assemble the `(k, k)` symmetric tridiagonal matrix from Lanczos
/// coefficients
pub(crate) fn tridiag_matrix<F: Float>(alpha: &Array1<F>, beta: &Array1<F>) -> Array2<F> {
    let k = alpha.len();
    let mut t = Array2::zeros((k, k));
    for i in 0..k {
        t[[i, i]] = alpha[i];
        if i + 1 < k {
            t[[i, i + 1]] = beta[i];
            t[[i + 1, i]] = beta[i];
        }
    }
    t
}
