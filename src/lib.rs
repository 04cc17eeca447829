//! This library implements lazy structured covariance matrices for
//! [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! regression together with the Krylov inference routines driving them.
//!
//! Exact GP algebra is in O(N^3) processing time and O(N^2) memory where N
//! is the number of training points. Structured covariance operators avoid
//! those costs by never materializing the full matrix: a
//! [`lazy::LazyMatrix`] only promises the structural operation set (matmul,
//! evaluation, diagonal extraction, transposition), and each concrete
//! variant — diagonal, sum, Kronecker product, Toeplitz, block-diagonal,
//! interpolated low-rank, Cholesky root — implements it through its own
//! structure-specific shortcut. Operators compose bottom-up into immutable
//! DAGs through the constructors of the [`lazy`] module.
//!
//! The inference routines consume nothing but that operation set:
//! * [`cg_solve`] — preconditioned conjugate-gradient linear solves,
//! * [`logdet_slq`] — stochastic Lanczos quadrature log-determinants,
//! * [`root_decomposition`] — exact or low-rank `R·Rᵀ` roots for sampling.
//!
//! Covariance blocks enter the lazy layer through the [`kernels`]
//! evaluators, deferred and memoized by [`lazy::LazyKernel`].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod factorization;
mod lanczos;
mod logdet;
mod solve;
mod utils;

pub mod kernels;
pub mod lazy;

pub use errors::*;
pub use factorization::*;
pub use logdet::*;
pub use solve::*;
