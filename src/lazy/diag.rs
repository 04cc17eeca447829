use super::{check_rhs, LazyMatrix};
use crate::errors::Result;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::any::Any;

/// A diagonal operator holding only its diagonal vector.
///
/// `matmul` scales the right-hand-side rows instead of forming the `n × n`
/// matrix.
#[derive(Debug, Clone)]
pub struct Diag<F: Float> {
    values: Array1<F>,
}

impl<F: Float> Diag<F> {
    /// Build a diagonal operator from its diagonal
    pub fn new(values: Array1<F>) -> Self {
        Diag { values }
    }
}

impl<F: Float> LazyMatrix<F> for Diag<F> {
    fn shape(&self) -> (usize, usize) {
        (self.values.len(), self.values.len())
    }

    fn matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        check_rhs(self.values.len(), &rhs)?;
        let col = self.values.view().insert_axis(Axis(1));
        Ok(&rhs * &col)
    }

    fn t_matmul(&self, rhs: ArrayView2<F>) -> Result<Array2<F>> {
        self.matmul(rhs)
    }

    fn evaluate(&self) -> Result<Array2<F>> {
        Ok(Array2::from_diag(&self.values))
    }

    fn diagonal(&self) -> Result<Array1<F>> {
        Ok(self.values.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_diag_matmul_scales_rows() {
        let d = Diag::new(array![1., 2., 3.]);
        let rhs = array![[1.], [1.], [1.]];
        assert_eq!(d.matmul(rhs.view()).unwrap(), array![[1.], [2.], [3.]]);
    }

    #[test]
    fn test_diag_evaluate() {
        let d = Diag::new(array![1., 2.]);
        assert_eq!(d.evaluate().unwrap(), array![[1., 0.], [0., 2.]]);
    }
}
