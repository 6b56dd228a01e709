// src/diagnostics.rs

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Computes the Frobenius norm of a matrix.
pub fn compute_frob_norm(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Sum of squared residuals between `original` and `approximation`.
/// Returns `None` when the shapes differ.
pub fn sum_squared_residuals(original: &ArrayView2<f64>, approximation: &ArrayView2<f64>) -> Option<f64> {
    if original.dim() != approximation.dim() {
        return None;
    }
    Some(
        original
            .iter()
            .zip(approximation.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum(),
    )
}

/// Computes the orthogonality error ||I - B Bᵀ||_F of a basis stored row-wise
/// (one basis vector per row, as the feature vector is).
pub fn compute_row_orthogonality_error(basis: &ArrayView2<f64>) -> Option<f64> {
    if basis.nrows() == 0 || basis.ncols() == 0 {
        return None;
    }
    let gram = basis.dot(&basis.t());
    let diff = Array2::<f64>::eye(gram.nrows()) - gram;
    Some(compute_frob_norm(&diff.view()))
}

/// Running sum of explained variance ratios; the last entry is ~1.0 for a full spectrum.
pub fn cumulative_sum(values: &ArrayView1<f64>) -> Array1<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn frob_norm_of_known_matrix() {
        let m = array![[3.0, 0.0], [0.0, 4.0]];
        assert_abs_diff_eq!(compute_frob_norm(&m.view()), 5.0, epsilon = 1e-12);
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(compute_frob_norm(&empty.view()), 0.0);
    }

    #[test]
    fn residuals_require_matching_shapes() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let b = array![[1.0, 2.0], [3.0, 2.0]];
        assert_abs_diff_eq!(sum_squared_residuals(&a.view(), &b.view()).unwrap(), 4.0, epsilon = 1e-12);
        let c = array![[1.0, 2.0]];
        assert!(sum_squared_residuals(&a.view(), &c.view()).is_none());
    }

    #[test]
    fn identity_rows_are_orthonormal() {
        let basis = array![[1.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
        assert_abs_diff_eq!(compute_row_orthogonality_error(&basis.view()).unwrap(), 0.0, epsilon = 1e-12);
        let skewed = array![[1.0, 0.0], [1.0, 0.0]];
        assert!(compute_row_orthogonality_error(&skewed.view()).unwrap() > 1.0);
    }

    #[test]
    fn cumulative_sum_accumulates() {
        let ratios = array![0.5, 0.3, 0.2];
        let cum = cumulative_sum(&ratios.view());
        assert_abs_diff_eq!(cum[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(cum[1], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(cum[2], 1.0, epsilon = 1e-12);
    }
}
