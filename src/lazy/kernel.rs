use super::{check_rhs, check_square, LazyMatrix};
use crate::errors::{LazyGpError, Result};
use crate::kernels::Kernel;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2};
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// A covariance block seen lazily through its kernel evaluator.
///
/// Holds the evaluator and the two point sets; the first structural
/// operation that needs the block invokes the evaluator once and memoizes
/// the result for the lifetime of this instance. The cache cell populates
/// atomically as a single replace, so racing first evaluations may
/// recompute an equal block but can never observe a partial write. There is
/// no transition back to the unevaluated state.
#[derive(Debug)]
pub struct LazyKernel<F: Float> {
    kernel: Arc<dyn Kernel<F>>,
    x1: Array2<F>,
    x2: Array2<F>,
    cache: OnceLock<Array2<F>>,
}

impl<F: Float> LazyKernel<F> {
    /// Defer the evaluation of `kernel` between the `(n1, d)` and `(n2, d)`
    /// point sets
    pub fn new(kernel: Arc<dyn Kernel<F>>, x1: Array2<F>, x2: Array2<F>) -> Result<Self> {
        if x1.ncols() != x2.ncols() {
            return Err(LazyGpError::ShapeError(format!(
                "point sets disagree on dimension: {} vs {}",
                x1.ncols(),
                x2.ncols()
            )));
        }
        if let Some(d) = kernel.input_dims() {
            if d != x1.ncols() {
                return Err(LazyGpError::ShapeError(format!(
                    "kernel expects {}-dimensional inputs, got {}",
                    d,
                    x1.ncols()
                )));
            }
        }
        Ok(LazyKernel {
            kernel,
            x1,
            x2,
            cache: OnceLock::new(),
        })
    }

    fn block(&self) -> &Array2<F> {
        self.cache
            .get_or_init(|| self.kernel.value(self.x1.view(), self.x2.view()))
    }
}

impl<F: Float> LazyMatrix<F> for LazyKernel<F> {
    fn shape(&self) -> (usize, usize) {
        (self.x1.nrows(), self.x2.nrows())
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().1, &rhs)?;
        Ok(self.block().dot(&rhs))
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().0, &rhs)?;
        Ok(self.block().t().dot(&rhs))
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(self.block().clone())
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        check_square(self.shape())?;
        Ok(self.block().diag().to_owned())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingKernel {
        calls: AtomicUsize,
    }

    impl Kernel<f64> for CountingKernel {
        fn value(&self, x1: ArrayView2<f64>, x2: ArrayView2<f64>) -> Array2<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Array2::from_shape_fn((x1.nrows(), x2.nrows()), |(i, j)| {
                if i == j {
                    2.
                } else {
                    0.5
                }
            })
        }
    }

    #[test]
    fn test_kernel_evaluated_once_across_operations() {
        let kernel = Arc::new(CountingKernel {
            calls: AtomicUsize::new(0),
        });
        let x = array![[0.], [1.], [2.]];
        let op = LazyKernel::new(kernel.clone(), x.clone(), x).unwrap();
        let rhs = array![[1.], [1.], [1.]];
        op.matmul(rhs.view()).unwrap();
        op.evaluate().unwrap();
        op.diagonal().unwrap();
        op.evaluate().unwrap();
        assert_eq!(kernel.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kernel_view_matches_block() {
        let kernel = Arc::new(CountingKernel {
            calls: AtomicUsize::new(0),
        });
        let x = array![[0.], [1.]];
        let op = LazyKernel::new(kernel, x.clone(), x).unwrap();
        assert_abs_diff_eq!(
            op.evaluate().unwrap(),
            array![[2., 0.5], [0.5, 2.]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_mismatched_point_sets_rejected() {
        let kernel = Arc::new(CountingKernel {
            calls: AtomicUsize::new(0),
        });
        let res = LazyKernel::new(kernel, array![[0., 1.]], array![[0.], [1.]]);
        assert!(matches!(res, Err(LazyGpError::ShapeError(_))));
    }
}
