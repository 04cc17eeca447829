//! Covariance kernel evaluators.
//!
//! A [`Kernel`] produces the raw covariance block between two point sets;
//! the lazy layer consumes that block through
//! [`LazyKernel`](crate::lazy::LazyKernel) without knowing how it was
//! computed. Two evaluators are implemented:
//! * [`SquaredExponentialKernel`], the anisotropic squared exponential,
//! * [`SpectralMixtureKernel`], a mixture of `q` spectral components able to
//!   represent quasi-periodic structure, with a data-driven initialization
//!   of its log-parameterized weights, means and scales.

use crate::errors::{LazyGpError, Result};
use crate::utils::{dim_extents, pairwise_differences};
use linfa::Float;
use ndarray::{Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use std::f64::consts::PI;
use std::fmt;

/// A covariance evaluator: the external boundary the lazy layer builds on.
///
/// Given two point sets of shape `(n1, d)` and `(n2, d)`, produce the raw
/// `(n1, n2)` covariance block.
pub trait Kernel<F: Float>: fmt::Debug + Send + Sync {
    /// Compute the covariance block between `x1` and `x2`.
    /// *Panics* if the point sets do not match the kernel dimension
    fn value(&self, x1: ArrayView2<F>, x2: ArrayView2<F>) -> Array2<F>;

    /// Input dimension this kernel is specialized to, if fixed
    fn input_dims(&self) -> Option<usize> {
        None
    }
}

/// Anisotropic squared exponential covariance
///
/// k(x, x') = exp( - 1/2 sum_j theta_j (x_j - x'_j)^2 )
#[derive(Debug, Clone)]
pub struct SquaredExponentialKernel<F: Float> {
    theta: Array1<F>,
}

impl<F: Float> SquaredExponentialKernel<F> {
    /// Build the kernel from its per-dimension inverse-squared lengthscales
    pub fn new(theta: Array1<F>) -> Self {
        SquaredExponentialKernel { theta }
    }
}

impl<F: Float> Kernel<F> for SquaredExponentialKernel<F> {
    fn value(&self, x1: ArrayView2<F>, x2: ArrayView2<F>) -> Array2<F> {
        assert!(x1.ncols() == self.theta.len() && x2.ncols() == self.theta.len());
        let (n1, n2) = (x1.nrows(), x2.nrows());
        let d = pairwise_differences(&x1, &x2);
        let r = d.mapv(|v| v * v).dot(&self.theta);
        r.mapv(|v| F::exp(F::cast(-0.5) * v))
            .into_shape((n1, n2))
            .unwrap()
    }

    fn input_dims(&self) -> Option<usize> {
        Some(self.theta.len())
    }
}

impl<F: Float> fmt::Display for SquaredExponentialKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Spectral mixture covariance over `q` components and `d` dimensions
///
/// ```text
///             q          d
/// k(x, x') = sum  w_i  prod  exp(-2 pi^2 tau_j^2 s_ij^2) cos(2 pi tau_j m_ij)
///            i=1        j=1
/// ```
///
/// with `tau = |x - x'|` and log-parameterized weights `w`, means `m` and
/// scales `s`.
#[derive(Debug, Clone)]
pub struct SpectralMixtureKernel<F: Float> {
    n_mixtures: usize,
    n_dims: usize,
    log_weights: Array1<F>,
    log_means: Array2<F>,
    log_scales: Array2<F>,
}

impl<F: Float> SpectralMixtureKernel<F> {
    /// Build a kernel with `n_mixtures` components over `n_dims` dimensions,
    /// all log-parameters starting at zero
    pub fn new(n_mixtures: usize, n_dims: usize) -> Self {
        SpectralMixtureKernel {
            n_mixtures,
            n_dims,
            log_weights: Array1::zeros(n_mixtures),
            log_means: Array2::zeros((n_mixtures, n_dims)),
            log_scales: Array2::zeros((n_mixtures, n_dims)),
        }
    }

    /// Build a kernel from explicit log-parameters
    pub fn from_parameters(
        log_weights: Array1<F>,
        log_means: Array2<F>,
        log_scales: Array2<F>,
    ) -> Result<Self> {
        let (n_mixtures, n_dims) = log_means.dim();
        if log_weights.len() != n_mixtures || log_scales.dim() != (n_mixtures, n_dims) {
            return Err(LazyGpError::ShapeError(format!(
                "inconsistent mixture parameters: {} weights, means {:?}, scales {:?}",
                log_weights.len(),
                log_means.dim(),
                log_scales.dim()
            )));
        }
        Ok(SpectralMixtureKernel {
            n_mixtures,
            n_dims,
            log_weights,
            log_means,
            log_scales,
        })
    }

    /// Number of mixture components
    pub fn n_mixtures(&self) -> usize {
        self.n_mixtures
    }

    /// Log mixture weights
    pub fn log_weights(&self) -> &Array1<F> {
        &self.log_weights
    }

    /// Log mixture means, `(q, d)`
    pub fn log_means(&self) -> &Array2<F> {
        &self.log_means
    }

    /// Log mixture scales, `(q, d)`
    pub fn log_scales(&self) -> &Array2<F> {
        &self.log_scales
    }

    /// Data-driven initialization of the mixture parameters.
    ///
    /// Inverse scales are drawn from |N(0, max_dist^2)| per dimension, means
    /// from Unif(0, 0.5 / min_dist) with `min_dist` the minimum positive
    /// pairwise gap per dimension, and weights start at std(y) divided by
    /// the number of components. Training inputs with fewer than 2 distinct
    /// coordinates along some dimension leave no positive gap and are
    /// rejected with a DataError.
    pub fn initialize_from_data<R: Rng + ?Sized>(
        &mut self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        rng: &mut R,
    ) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(LazyGpError::ShapeError(format!(
                "{} training points against {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != self.n_dims {
            return Err(LazyGpError::ShapeError(format!(
                "kernel expects {}-dimensional inputs, got {}",
                self.n_dims,
                x.ncols()
            )));
        }
        if x.nrows() < 2 {
            return Err(LazyGpError::DataError(
                "at least 2 training points are required".to_string(),
            ));
        }
        let (max_dist, min_dist) = dim_extents(x)?;

        let q = self.n_mixtures;
        let d = self.n_dims;
        let normal = Array::random_using((q, d), Normal::new(0., 1.).unwrap(), rng).mapv(F::cast);
        self.log_scales = (normal * &max_dist).mapv(|v| v.abs().recip().ln());

        let uniform = Array::random_using((q, d), Uniform::new(0., 1.), rng).mapv(F::cast);
        self.log_means = (uniform * F::cast(0.5) / &min_dist).mapv(|v| v.ln());

        let weight = y.std(F::one()) / F::cast(q);
        self.log_weights.fill(weight.ln());
        Ok(())
    }
}

impl<F: Float> Kernel<F> for SpectralMixtureKernel<F> {
    fn value(&self, x1: ArrayView2<F>, x2: ArrayView2<F>) -> Array2<F> {
        assert!(x1.ncols() == self.n_dims && x2.ncols() == self.n_dims);
        let (n1, n2) = (x1.nrows(), x2.nrows());
        let tau = pairwise_differences(&x1, &x2).mapv(|v| v.abs());
        let two_pi = F::cast(2. * PI);
        let neg_two_pi2 = F::cast(-2. * PI * PI);

        let mut flat = Array1::<F>::zeros(n1 * n2);
        for i in 0..self.n_mixtures {
            let weight = self.log_weights[i].exp();
            let scales = self.log_scales.row(i).mapv(|v| v.exp());
            let means = self.log_means.row(i).mapv(|v| v.exp());
            let exp_term = (&tau * &scales).mapv(|v| F::exp(neg_two_pi2 * v * v));
            let cos_term = (&tau * &means).mapv(|v| F::cos(two_pi * v));
            let component =
                (exp_term * cos_term).map_axis(Axis(1), |row| row.fold(F::one(), |acc, &v| acc * v));
            flat.scaled_add(weight, &component);
        }
        flat.into_shape((n1, n2)).unwrap()
    }

    fn input_dims(&self) -> Option<usize> {
        Some(self.n_dims)
    }
}

impl<F: Float> fmt::Display for SpectralMixtureKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SpectralMixture(q={})", self.n_mixtures)
    }
}
