use crate::errors::{LazyGpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

/// Computes differences between each row of x and each row of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub(crate) fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let nx = x.nrows();
    let ny = y.nrows();
    let ncols = x.ncols();
    let mut result = Array2::zeros((nx * ny, ncols));

    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            let idx = i * ny + j;
            for k in 0..ncols {
                result[[idx, k]] = x_row[k] - y_row[k];
            }
        }
    }

    result
}

/// Per-dimension spread of a training input set: the maximum pairwise extent
/// and the minimum positive gap between sorted coordinates.
///
/// A dimension with fewer than 2 distinct coordinates has no positive gap
/// and is rejected with a DataError instead of silently dividing by zero
/// downstream.
pub(crate) fn dim_extents<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<(Array1<F>, Array1<F>)> {
    let d = x.ncols();
    let mut max_dist = Array1::zeros(d);
    let mut min_gap = Array1::zeros(d);
    for j in 0..d {
        let mut col: Vec<F> = x.column(j).to_vec();
        col.sort_by(|a, b| a.partial_cmp(b).unwrap());
        max_dist[j] = *col.last().unwrap() - col[0];
        let mut smallest: Option<F> = None;
        for w in col.windows(2) {
            let gap = w[1] - w[0];
            if gap > F::zero() && smallest.map_or(true, |s| gap < s) {
                smallest = Some(gap);
            }
        }
        min_gap[j] = smallest.ok_or_else(|| {
            LazyGpError::DataError(format!(
                "fewer than 2 distinct coordinates along dimension {j}"
            ))
        })?;
    }
    Ok((max_dist, min_gap))
}
