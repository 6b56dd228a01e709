// src/covariance.rs

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{PcaError, PcaResult};

/// How the covariance matrix is assembled from centered data.
///
/// Both strategies produce the same matrix up to floating-point rounding of the
/// inner sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceStrategy {
    /// Explicit double loop over every (feature, feature) pair of centered columns,
    /// summing elementwise products. O(n_features² · n_instances).
    Pairwise,
    /// `Cᵀ · C / (n_instances - 1)` via a single matrix product, upper triangle mirrored.
    #[default]
    Gram,
}

/// Per-feature arithmetic mean of `data` (rows are observations).
pub fn column_means(data: &ArrayView2<f64>) -> PcaResult<Array1<f64>> {
    data.mean_axis(Axis(0)).ok_or_else(|| {
        PcaError::NumericalDegeneracy("Cannot compute the mean of a dataset with zero rows.".to_string())
    })
}

/// Subtracts `means` from every row of `data`.
pub fn center(data: &ArrayView2<f64>, means: &Array1<f64>) -> PcaResult<Array2<f64>> {
    if data.ncols() != means.len() {
        return Err(PcaError::ShapeMismatch(format!(
            "Data has {} features but the mean vector has length {}.",
            data.ncols(),
            means.len()
        )));
    }
    Ok(data - &means.view().insert_axis(Axis(0)))
}

fn denominator(centered: &ArrayView2<f64>) -> PcaResult<f64> {
    let n_instances = centered.nrows();
    if n_instances < 2 {
        return Err(PcaError::NumericalDegeneracy(format!(
            "Covariance needs at least 2 instances, got {}.",
            n_instances
        )));
    }
    Ok((n_instances - 1) as f64)
}

/// Covariance by the definition: entry (i, j) is the sum over instances of
/// `C[k, i] * C[k, j]`, divided by `n_instances - 1`.
pub fn covariance_pairwise(centered: &ArrayView2<f64>) -> PcaResult<Array2<f64>> {
    let denom = denominator(centered)?;
    let n_features = centered.ncols();
    let mut cov = Array2::<f64>::zeros((n_features, n_features));
    for (i, col_i) in centered.axis_iter(Axis(1)).enumerate() {
        for (j, col_j) in centered.axis_iter(Axis(1)).enumerate() {
            cov[[i, j]] = (&col_i * &col_j).sum() / denom;
        }
    }
    Ok(cov)
}

/// Covariance through the Gram identity `Cᵀ · C / (n_instances - 1)`.
/// The lower triangle is overwritten with the upper one so the result is exactly symmetric.
pub fn covariance_gram(centered: &ArrayView2<f64>) -> PcaResult<Array2<f64>> {
    let denom = denominator(centered)?;
    let mut cov = centered.t().dot(centered);
    cov /= denom;
    let n_features = cov.nrows();
    for i in 0..n_features {
        for j in 0..i {
            cov[[i, j]] = cov[[j, i]];
        }
    }
    Ok(cov)
}

/// Dispatches to the requested covariance strategy.
pub fn covariance_matrix(centered: &ArrayView2<f64>, strategy: CovarianceStrategy) -> PcaResult<Array2<f64>> {
    match strategy {
        CovarianceStrategy::Pairwise => covariance_pairwise(centered),
        CovarianceStrategy::Gram => covariance_gram(centered),
    }
}
