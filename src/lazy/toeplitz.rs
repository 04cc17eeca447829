use super::{check_rhs, LazyMatrix};
use crate::errors::{LazyGpError, Result};
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayView2};
use std::any::Any;

/// A symmetric Toeplitz operator held as its generating vector (the first
/// column).
///
/// `matmul` walks the nonzero support of the generating vector, adding one
/// shifted, scaled copy of the right-hand side per nonzero entry. For the
/// short-support vectors this structure is used with, the cost is near
/// linear in `n` and the `n × n` matrix is never formed.
#[derive(Debug, Clone)]
pub struct Toeplitz<F: Float> {
    column: Array1<F>,
}

impl<F: Float> Toeplitz<F> {
    /// Build a symmetric Toeplitz operator from its first column
    pub fn new(column: Array1<F>) -> Result<Self> {
        if column.is_empty() {
            return Err(LazyGpError::DataError(
                "empty Toeplitz generating vector".to_string(),
            ));
        }
        Ok(Toeplitz { column })
    }
}

impl<F: Float> LazyMatrix<F> for Toeplitz<F> {
    fn shape(&self) -> (usize, usize) {
        (self.column.len(), self.column.len())
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        let n = self.column.len();
        check_rhs(n, &rhs)?;
        let mut out = Array2::zeros((n, rhs.ncols()));
        for (off, &c) in self.column.iter().enumerate() {
            if c == F::zero() {
                continue;
            }
            if off == 0 {
                out.scaled_add(c, &rhs);
            } else {
                out.slice_mut(s![off.., ..])
                    .scaled_add(c, &rhs.slice(s![..n - off, ..]));
                out.slice_mut(s![..n - off, ..])
                    .scaled_add(c, &rhs.slice(s![off.., ..]));
            }
        }
        Ok(out)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        self.matmul(rhs)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let n = self.column.len();
        Ok(Array2::from_shape_fn((n, n), |(i, j)| {
            self.column[if i > j { i - j } else { j - i }]
        }))
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        Ok(Array1::from_elem(self.column.len(), self.column[0]))
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

    #[test]
    fn test_toeplitz_evaluate() {
        let t = Toeplitz::new(array![4., 1., 0.]).unwrap();
        assert_eq!(
            t.evaluate().unwrap(),
            array![[4., 1., 0.], [1., 4., 1.], [0., 1., 4.]]
        );
    }

    #[test]
    fn test_toeplitz_matmul_identity_reproduces_dense() {
        let t = Toeplitz::new(array![4., 1., 0.]).unwrap();
        let eye = Array2::eye(3);
        assert_abs_diff_eq!(
            t.matmul(eye.view()).unwrap(),
            t.evaluate().unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_toeplitz_matmul_matches_dense() {
        let t = Toeplitz::new(array![2., -1., 0.5, 0., 0.]).unwrap();
        let rhs = array![[1., 0.], [2., 1.], [0., -1.], [1., 1.], [3., 0.]];
        assert_abs_diff_eq!(
            t.matmul(rhs.view()).unwrap(),
            t.evaluate().unwrap().dot(&rhs),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_generating_vector_rejected() {
        assert!(Toeplitz::<f64>::new(Array1::zeros(0)).is_err());
    }
}
