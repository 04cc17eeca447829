use super::{check_rhs, LazyMatrix, LazyRef};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::any::Any;

/// A symmetric positive semi-definite operator held through its root factor:
/// the represented matrix is `R · Rᵀ`.
///
/// Used both as a compact representation and as the output of
/// [`root_decomposition`](crate::root_decomposition); sampling a Gaussian
/// with this covariance only needs `R · z`.
#[derive(Debug, Clone)]
pub struct Root<F: Float> {
    root: LazyRef<F>,
}

impl<F: Float> Root<F> {
    /// Represent `root · rootᵀ`
    pub fn new(root: LazyRef<F>) -> Self {
        Root { root }
    }

    /// The root factor `R`
    pub fn root(&self) -> &LazyRef<F> {
        &self.root
    }
}

impl<F: Float> LazyMatrix<F> for Root<F> {
    fn shape(&self) -> (usize, usize) {
        let m = self.root.shape().0;
        (m, m)
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.shape().1, &rhs)?;
        let inner = self.root.t_matmul(rhs)?;
        self.root.matmul(inner.view())
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        self.matmul(rhs)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        let r = self.root.evaluate()?;
        Ok(r.dot(&r.t()))
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        let r = self.root.evaluate()?;
        Ok(r.mapv(|v| v * v).sum_axis(Axis(1)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Dense, IntoLazy};
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_root_represents_r_rt() {
        let r = array![[1., 0.], [2., 1.], [0., 3.]];
        let op = Root::new(Dense::new(r.clone()).into_lazy());
        assert_eq!(op.shape(), (3, 3));
        assert_abs_diff_eq!(op.evaluate().unwrap(), r.dot(&r.t()), epsilon = 1e-12);
        assert_abs_diff_eq!(
            op.diagonal().unwrap(),
            array![1., 5., 9.],
            epsilon = 1e-12
        );
    }
}
