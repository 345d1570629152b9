//! Dense pairwise geometry shared by interactions and controllers.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};

/// Distances below this are treated as this value to avoid division by zero.
pub(crate) const MIN_DISTANCE: f64 = 1e-6;

/// Relative positions and distances between two point sets.
#[derive(Debug, Clone)]
pub(crate) struct PairGeometry {
    /// `offsets[[i, j, k]] = a[[i, k]] - b[[j, k]]`, shape `(N, M, dims)`.
    pub offsets: Array3<f64>,
    /// Euclidean norm of each offset, shape `(N, M)`. Not floored.
    pub distances: Array2<f64>,
}

/// Computes all pairwise offsets `a_i - b_j` and their lengths.
///
/// Both views must have the same number of columns.
pub(crate) fn pairwise(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> PairGeometry {
    let (n, dims) = a.dim();
    let m = b.nrows();
    debug_assert_eq!(dims, b.ncols());

    let offsets = Array3::from_shape_fn((n, m, dims), |(i, j, k)| a[[i, k]] - b[[j, k]]);
    let distances = offsets.map_axis(Axis(2), |v| norm(v));

    PairGeometry { offsets, distances }
}

/// Euclidean norm of a vector.
pub(crate) fn norm(v: ArrayView1<'_, f64>) -> f64 {
    v.iter().map(|c| c * c).sum::<f64>().sqrt()
}

/// Euclidean norm of every row.
pub(crate) fn row_norms(a: ArrayView2<'_, f64>) -> Array1<f64> {
    a.map_axis(Axis(1), |row| norm(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn pairwise_offsets_point_from_b_to_a() {
        let a = array![[0.0, 0.0], [5.0, 0.0]];
        let b = array![[3.0, 4.0]];
        let geom = pairwise(a.view(), b.view());
        assert_eq!(geom.offsets.dim(), (2, 1, 2));
        assert_eq!(geom.offsets[[0, 0, 0]], -3.0);
        assert_eq!(geom.offsets[[0, 0, 1]], -4.0);
        assert!((geom.distances[[0, 0]] - 5.0).abs() < 1e-12);
        assert!((geom.distances[[1, 0]] - (4.0f64 + 16.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn row_norms_match() {
        let a = array![[3.0, 4.0], [0.0, 0.0]];
        let n = row_norms(a.view());
        assert_eq!(n, array![5.0, 0.0]);
    }
}
