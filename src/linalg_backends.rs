// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;

use crate::error::{PcaError, PcaResult};

// --- Trait Definitions ---

/// Output of a real eigendecomposition.
#[derive(Debug, Clone)]
pub struct EighOutput {
    /// Eigenvalues in the order the solver produced them (ascending for LAPACK/faer `eigh`).
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Trait for symmetric eigendecomposition (LAPACK's DSYEVD or faer's self-adjoint solver).
/// Implementers expect `matrix` to be symmetric and only read the upper triangle.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>>;
}

/// Output of a general (non-symmetric) eigendecomposition, split into real and imaginary parts.
#[derive(Debug, Clone)]
pub struct EigOutput {
    pub eigenvalues_re: Array1<f64>,
    pub eigenvalues_im: Array1<f64>,
    /// Right eigenvectors as columns.
    pub eigenvectors_re: Array2<f64>,
    pub eigenvectors_im: Array2<f64>,
}

/// Trait for the general eigenproblem (LAPACK's DGEEV). The output may be complex
/// even for symmetric input because of rounding.
pub trait BackendEig {
    fn eig_general(&self, matrix: &Array2<f64>) -> Result<EigOutput, Box<dyn Error + Send + Sync>>;
}

impl EigOutput {
    /// Coerces the complex decomposition to the real domain.
    ///
    /// The largest imaginary component (of eigenvalues or eigenvectors) must not exceed
    /// `tolerance` relative to the largest eigenvalue magnitude (eigenvalues) or to 1
    /// (unit-norm eigenvectors). Anything larger means the matrix was not really
    /// symmetric, and is reported rather than dropped.
    pub fn into_real(self, tolerance: f64) -> PcaResult<EighOutput> {
        let scale = self
            .eigenvalues_re
            .iter()
            .zip(self.eigenvalues_im.iter())
            .map(|(re, im)| re.hypot(*im))
            .fold(0.0_f64, f64::max)
            .max(f64::MIN_POSITIVE);

        let max_value_im = self.eigenvalues_im.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_value_im > tolerance * scale {
            return Err(PcaError::NumericalDegeneracy(format!(
                "General eigensolver returned eigenvalues with imaginary parts up to {:e} (largest magnitude {:e}); the covariance matrix is not real-symmetric.",
                max_value_im, scale
            )));
        }
        let max_vector_im = self.eigenvectors_im.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_vector_im > tolerance {
            return Err(PcaError::NumericalDegeneracy(format!(
                "General eigensolver returned eigenvectors with imaginary components up to {:e}.",
                max_vector_im
            )));
        }

        Ok(EighOutput {
            eigenvalues: self.eigenvalues_re,
            eigenvectors: self.eigenvectors_re,
        })
    }
}

// --- NdarrayLinAlgBackend Implementation ---
use ndarray_linalg::{Eig as NdLinalgEig, Eigh as NdLinalgEigh, UPLO};

/// ndarray-linalg (LAPACK) backend.
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

// Helper to convert ndarray-linalg's error to Box<dyn Error + Send + Sync>
fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
    Box::new(e)
}

impl BackendEigh for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

impl BackendEig for NdarrayLinAlgBackend {
    fn eig_general(&self, matrix: &Array2<f64>) -> Result<EigOutput, Box<dyn Error + Send + Sync>> {
        let (values, vectors) = matrix.eig().map_err(to_dyn_error)?;
        Ok(EigOutput {
            eigenvalues_re: values.mapv(|z| z.re),
            eigenvalues_im: values.mapv(|z| z.im),
            eigenvectors_re: vectors.mapv(|z| z.re),
            eigenvectors_im: vectors.mapv(|z| z.im),
        })
    }
}

// --- FaerLinAlgBackend Implementation ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendEigh, EighOutput};
    use ndarray::{Array1, Array2};
    use std::error::Error;

    fn to_dyn_error_faer(msg: String) -> Box<dyn Error + Send + Sync> {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    impl BackendEigh for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
            let (nrows, ncols) = matrix.dim();
            if nrows != ncols {
                return Err(to_dyn_error_faer(format!(
                    "Matrix must be square for eigendecomposition, got {}x{}.",
                    nrows, ncols
                )));
            }
            if matrix.is_empty() {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            // Covariance matrices are small (n_features x n_features); copying avoids layout checks.
            let faer_mat = faer::Mat::<f64>::from_fn(nrows, ncols, |i, j| matrix[[i, j]]);
            let evd = faer_mat
                .as_ref()
                .self_adjoint_eigen(faer::Side::Upper)
                .map_err(|e| to_dyn_error_faer(format!("Faer self-adjoint eigendecomposition failed: {:?}", e)))?;
            let values = evd.S().column_vector();
            let vectors = evd.U();
            Ok(EighOutput {
                eigenvalues: Array1::from_shape_fn(nrows, |i| values[i]),
                eigenvectors: Array2::from_shape_fn((nrows, ncols), |(i, j)| vectors[(i, j)]),
            })
        }
    }
}

// --- LinAlgBackendProvider Dispatch ---

/// A provider struct that dispatches to the selected linear algebra backend
/// based on compile-time feature flags. The general solver is always LAPACK.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

impl BackendEig for LinAlgBackendProvider {
    fn eig_general(&self, matrix: &Array2<f64>) -> Result<EigOutput, Box<dyn Error + Send + Sync>> {
        NdarrayLinAlgBackend.eig_general(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn eigh_returns_ascending_eigenvalues_of_diagonal_matrix() {
        let m = array![[3.0, 0.0], [0.0, 1.0]];
        let out = LinAlgBackendProvider::new().eigh_upper(&m).unwrap();
        assert_abs_diff_eq!(out.eigenvalues[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.eigenvalues[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.eigenvectors[[1, 0]].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn general_solver_on_symmetric_matrix_is_real() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let out = LinAlgBackendProvider::new().eig_general(&m).unwrap();
        let real = out.into_real(1e-9).unwrap();
        let mut values = real.eigenvalues.to_vec();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn rotation_matrix_has_complex_spectrum_and_is_rejected() {
        // 90 degree rotation: eigenvalues are +i and -i.
        let m = array![[0.0, -1.0], [1.0, 0.0]];
        let out = LinAlgBackendProvider::new().eig_general(&m).unwrap();
        match out.into_real(1e-9) {
            Err(PcaError::NumericalDegeneracy(msg)) => assert!(msg.contains("imaginary")),
            other => panic!("expected NumericalDegeneracy, got {:?}", other),
        }
    }
}
