// Principal component analysis (PCA) by covariance eigendecomposition

use log::{debug, info, trace, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use std::cmp::Ordering;
use std::time::Instant;

use crate::covariance::{self, CovarianceStrategy};
use crate::diagnostics;
use crate::error::{PcaError, PcaResult};
use crate::linalg_backends::{BackendEig, BackendEigh, EighOutput, LinAlgBackendProvider};

/// Number of principal axes kept by [`PcaEngine::fit_default`].
pub const DEFAULT_AXES: usize = 2;

/// Which eigensolver is applied to the covariance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigenSolverKind {
    /// Symmetric solver; eigenvalues are real by construction.
    #[default]
    Symmetric,
    /// General solver with complex output, coerced to real parts after checking
    /// that the imaginary residue is negligible.
    General,
}

/// Sign normalization applied to the eigenvectors after descending ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignConvention {
    /// Negate every eigenvector at an odd position (0-indexed) of the sorted order.
    /// Depends on the solver's own sign choice; kept for output compatibility.
    #[default]
    AlternatingNegation,
    /// Flip each eigenvector so its largest-magnitude component is positive
    /// (first such component on ties).
    LargestComponentPositive,
}

/// Configuration for [`PcaEngine`].
#[derive(Debug, Clone)]
pub struct PcaConfig {
    /// Eigensolver used on the covariance matrix.
    pub solver: EigenSolverKind,
    /// How the covariance matrix is assembled.
    pub covariance: CovarianceStrategy,
    /// Sign normalization of the ordered eigenvectors.
    pub sign_convention: SignConvention,
    /// Largest tolerated imaginary residue from the general solver, relative to the
    /// largest eigenvalue magnitude (eigenvalues) or absolute (unit eigenvectors).
    pub imaginary_tolerance: f64,
    /// Relative threshold (against the largest eigenvalue magnitude) below whose
    /// negative an eigenvalue is rejected.
    pub degeneracy_tolerance: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            solver: EigenSolverKind::Symmetric,
            covariance: CovarianceStrategy::Gram,
            sign_convention: SignConvention::AlternatingNegation,
            imaginary_tolerance: 1e-9,
            degeneracy_tolerance: 1e-12,
        }
    }
}

impl PcaConfig {
    pub fn with_solver(mut self, solver: EigenSolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_covariance(mut self, covariance: CovarianceStrategy) -> Self {
        self.covariance = covariance;
        self
    }

    pub fn with_sign_convention(mut self, sign_convention: SignConvention) -> Self {
        self.sign_convention = sign_convention;
        self
    }

    pub fn with_imaginary_tolerance(mut self, tolerance: f64) -> Self {
        self.imaginary_tolerance = tolerance;
        self
    }

    pub fn with_degeneracy_tolerance(mut self, tolerance: f64) -> Self {
        self.degeneracy_tolerance = tolerance;
        self
    }
}

/// Everything that does not depend on `axes`. Cached across `fit` calls.
#[derive(Debug, Clone)]
struct Decomposition {
    mean: Array1<f64>,
    centered: Array2<f64>,
    covariance: Array2<f64>,
    unordered_eigenvalues: Array1<f64>,
    unordered_eigenvectors: Array2<f64>,
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
}

/// One generation of fitted state, produced by [`PcaEngine::fit_result`].
///
/// Immutable once built; a later `fit` replaces the engine's record instead of
/// mutating this one.
#[derive(Debug, Clone)]
pub struct PcaFit {
    axes: usize,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    unordered_eigenvalues: Array1<f64>,
    unordered_eigenvectors: Array2<f64>,
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
    feature_vector: Array2<f64>,
    transformed_data: Array2<f64>,
    reconstructed_data: Array2<f64>,
    explained_variance_ratio: Array1<f64>,
    reconstruction_error: f64,
}

impl PcaFit {
    /// Number of principal axes kept.
    pub fn axes(&self) -> usize {
        self.axes
    }

    /// Per-feature mean of the dataset. Shape: (n_features)
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Covariance matrix. Shape: (n_features, n_features)
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Eigenvalues in solver order, before sorting.
    pub fn unordered_eigenvalues(&self) -> &Array1<f64> {
        &self.unordered_eigenvalues
    }

    /// Eigenvectors in solver order and sign, one per column.
    pub fn unordered_eigenvectors(&self) -> &Array2<f64> {
        &self.unordered_eigenvectors
    }

    /// Eigenvalues sorted descending.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// Sorted and sign-normalized eigenvectors, one per row.
    /// Shape: (n_features, n_features)
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    /// The first `axes` rows of [`eigenvectors`](Self::eigenvectors).
    /// Shape: (axes, n_features)
    pub fn feature_vector(&self) -> &Array2<f64> {
        &self.feature_vector
    }

    /// Projection of the centered data onto the feature vector.
    /// Shape: (axes, n_instances)
    pub fn transformed_data(&self) -> &Array2<f64> {
        &self.transformed_data
    }

    /// Back-projection of the transformed data plus the mean.
    /// Shape: (n_instances, n_features)
    pub fn reconstructed_data(&self) -> &Array2<f64> {
        &self.reconstructed_data
    }

    /// Each eigenvalue divided by the sum of all eigenvalues. Shape: (n_features)
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Sum of squared residuals between the dataset and its reconstruction.
    pub fn reconstruction_error(&self) -> f64 {
        self.reconstruction_error
    }

    /// Running total of the explained variance ratio.
    pub fn cumulative_explained_variance(&self) -> Array1<f64> {
        diagnostics::cumulative_sum(&self.explained_variance_ratio.view())
    }

    /// The value returned by [`PcaEngine::fit`]: the transformed data, negated.
    pub fn fit_output(&self) -> Array2<f64> {
        self.transformed_data.mapv(|v| -v)
    }

    /// Projects new observations (rows) onto the fitted feature vector, using the
    /// fitted mean. Same orientation as [`transformed_data`](Self::transformed_data).
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `data` does not have `n_features` columns.
    pub fn project(&self, data: &ArrayView2<f64>) -> PcaResult<Array2<f64>> {
        if data.ncols() != self.mean.len() {
            return Err(PcaError::ShapeMismatch(format!(
                "Input data feature dimension ({}) does not match the fitted feature dimension ({}).",
                data.ncols(),
                self.mean.len()
            )));
        }
        if data.nrows() == 0 {
            return Ok(Array2::zeros((self.axes, 0)));
        }
        let centered = covariance::center(data, &self.mean)?;
        Ok(self.feature_vector.dot(&centered.t()))
    }
}

/// PCA over one immutable dataset.
///
/// Rows of the dataset are instances and columns are features. The engine keeps
/// the eigendecomposition of the covariance matrix (which does not depend on
/// the number of axes) and the most recent [`PcaFit`].
///
/// # Examples
///
/// ```no_run
/// use eigen_pca::PcaEngine;
/// use ndarray::array;
///
/// let data = array![[0.0, 0.0], [0.0, 2.0], [2.0, 0.0], [2.0, 2.0]];
/// let mut engine = PcaEngine::new(data, "square");
/// let projected = engine.fit(2).unwrap();
/// assert_eq!(projected.dim(), (2, 4));
/// ```
#[derive(Debug, Clone)]
pub struct PcaEngine {
    data: Array2<f64>,
    name: String,
    n_instances: usize,
    n_features: usize,
    config: PcaConfig,
    decomposition: Option<Decomposition>,
    last_fit: Option<PcaFit>,
}

impl PcaEngine {
    /// Creates an engine with the default configuration. Nothing is computed until `fit`.
    pub fn new(data: Array2<f64>, name: impl Into<String>) -> Self {
        Self::with_config(data, name, PcaConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(data: Array2<f64>, name: impl Into<String>, config: PcaConfig) -> Self {
        let (n_instances, n_features) = data.dim();
        Self {
            data,
            name: name.into(),
            n_instances,
            n_features,
            config,
            decomposition: None,
            last_fit: None,
        }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Identifier of the dataset, used in log lines and plot titles.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_instances(&self) -> usize {
        self.n_instances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// The record produced by the most recent successful fit, if any.
    pub fn last_fit(&self) -> Option<&PcaFit> {
        self.last_fit.as_ref()
    }

    /// Fits with [`DEFAULT_AXES`] axes.
    pub fn fit_default(&mut self) -> PcaResult<Array2<f64>> {
        self.fit(DEFAULT_AXES)
    }

    /// Fits the model keeping `axes` principal axes and returns the negated
    /// projection of the centered data, shape (axes, n_instances).
    ///
    /// # Errors
    /// - `InvalidArgument` if `axes` is not in `[1, n_features]`.
    /// - `NumericalDegeneracy` if the dataset has fewer than 2 rows, contains
    ///   non-finite values, has zero variance in every feature, or the solver
    ///   returns unusable eigenvalues.
    /// - `Solver` if the linear algebra backend fails.
    pub fn fit(&mut self, axes: usize) -> PcaResult<Array2<f64>> {
        Ok(self.fit_result(axes)?.fit_output())
    }

    /// Fits the model and returns the full result record, which also becomes
    /// [`last_fit`](Self::last_fit). A failed call leaves the previous record in place.
    pub fn fit_result(&mut self, axes: usize) -> PcaResult<&PcaFit> {
        if axes == 0 || axes > self.n_features {
            return Err(PcaError::InvalidArgument(format!(
                "axes must be in [1, {}] for dataset '{}', got {}.",
                self.n_features, self.name, axes
            )));
        }
        info!(
            "Fitting PCA on '{}' ({} instances x {} features) with {} axes.",
            self.name, self.n_instances, self.n_features, axes
        );
        let fit_start_time = Instant::now();

        let decomposition = match self.decomposition.take() {
            Some(cached) => {
                debug!("Reusing cached eigendecomposition for '{}'.", self.name);
                cached
            }
            None => self.decompose()?,
        };
        let fit = build_fit(&self.data, &decomposition, axes);
        self.decomposition = Some(decomposition);
        let fit = fit?;

        if let Some(previous) = self.last_fit.as_ref() {
            debug!(
                "Replacing previous fit of '{}' ({} axes) with {} axes.",
                self.name, previous.axes, axes
            );
        }
        info!(
            "Fitted PCA on '{}' in {:?}; first axis explains {:.4} of the variance.",
            self.name,
            fit_start_time.elapsed(),
            fit.explained_variance_ratio[0]
        );
        let stored: &PcaFit = self.last_fit.insert(fit);
        Ok(stored)
    }

    fn decompose(&self) -> PcaResult<Decomposition> {
        if self.n_instances < 2 {
            return Err(PcaError::NumericalDegeneracy(format!(
                "Dataset '{}' must have at least 2 instances, got {}.",
                self.name, self.n_instances
            )));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(PcaError::NumericalDegeneracy(format!(
                "Dataset '{}' contains non-finite (NaN or infinity) values.",
                self.name
            )));
        }

        let stage_start_time = Instant::now();
        let mean = covariance::column_means(&self.data.view())?;
        let centered = covariance::center(&self.data.view(), &mean)?;
        let cov = covariance::covariance_matrix(&centered.view(), self.config.covariance)?;
        trace!(
            "Computed {:?} covariance for '{}' in {:?}",
            self.config.covariance,
            self.name,
            stage_start_time.elapsed()
        );

        let total_variance = cov.diag().sum();
        if total_variance <= rounding_variance_floor(&mean, self.n_instances) {
            return Err(PcaError::NumericalDegeneracy(format!(
                "Dataset '{}' has zero variance in every feature (total variance {:e}).",
                self.name, total_variance
            )));
        }

        let stage_start_time = Instant::now();
        let backend = LinAlgBackendProvider::new();
        debug!("Solving eigenproblem for '{}' with the {:?} solver.", self.name, self.config.solver);
        let EighOutput {
            eigenvalues: unordered_eigenvalues,
            eigenvectors: unordered_eigenvectors,
        } = match self.config.solver {
            EigenSolverKind::Symmetric => backend
                .eigh_upper(&cov)
                .map_err(|e| PcaError::Solver(format!("Eigen decomposition of covariance matrix failed: {}", e)))?,
            EigenSolverKind::General => backend
                .eig_general(&cov)
                .map_err(|e| PcaError::Solver(format!("Eigen decomposition of covariance matrix failed: {}", e)))?
                .into_real(self.config.imaginary_tolerance)?,
        };
        trace!("Eigendecomposition for '{}' took {:?}", self.name, stage_start_time.elapsed());

        validate_eigenvalues(&unordered_eigenvalues, self.config.degeneracy_tolerance)?;

        let order = descending_order(&unordered_eigenvalues);
        let eigenvalues: Array1<f64> = order.iter().map(|&k| unordered_eigenvalues[k]).collect();
        let n = order.len();
        let mut eigenvectors = Array2::from_shape_fn((n, n), |(row, col)| unordered_eigenvectors[[col, order[row]]]);
        apply_sign_convention(&mut eigenvectors, self.config.sign_convention);

        Ok(Decomposition {
            mean,
            centered,
            covariance: cov,
            unordered_eigenvalues,
            unordered_eigenvectors,
            eigenvalues,
            eigenvectors,
        })
    }
}

/// Total variance that centering alone can produce from rounding: each feature's
/// centered values are off by about `|mean| * n * eps` when the data is constant.
fn rounding_variance_floor(mean: &Array1<f64>, n_instances: usize) -> f64 {
    let per_unit = n_instances as f64 * f64::EPSILON;
    mean.iter().map(|m| (m.abs() * per_unit).powi(2)).sum()
}

/// Slices the basis, projects, reconstructs and computes variance ratios.
fn build_fit(data: &Array2<f64>, decomposition: &Decomposition, axes: usize) -> PcaResult<PcaFit> {
    let feature_vector = decomposition.eigenvectors.slice(s![..axes, ..]).to_owned();
    let transformed_data = feature_vector.dot(&decomposition.centered.t());
    let reconstructed_data =
        transformed_data.t().dot(&feature_vector) + &decomposition.mean.view().insert_axis(Axis(0));
    let total: f64 = decomposition.eigenvalues.sum();
    let explained_variance_ratio = decomposition.eigenvalues.mapv(|v| v / total);
    let reconstruction_error = diagnostics::sum_squared_residuals(&data.view(), &reconstructed_data.view())
        .ok_or_else(|| {
            PcaError::ShapeMismatch(format!(
                "Reconstruction has shape {:?} but the dataset has shape {:?}.",
                reconstructed_data.dim(),
                data.dim()
            ))
        })?;

    Ok(PcaFit {
        axes,
        mean: decomposition.mean.clone(),
        covariance: decomposition.covariance.clone(),
        unordered_eigenvalues: decomposition.unordered_eigenvalues.clone(),
        unordered_eigenvectors: decomposition.unordered_eigenvectors.clone(),
        eigenvalues: decomposition.eigenvalues.clone(),
        eigenvectors: decomposition.eigenvectors.clone(),
        feature_vector,
        transformed_data,
        reconstructed_data,
        explained_variance_ratio,
        reconstruction_error,
    })
}

/// Rejects NaN eigenvalues and eigenvalues that are negative beyond rounding noise.
fn validate_eigenvalues(eigenvalues: &Array1<f64>, tolerance: f64) -> PcaResult<()> {
    if eigenvalues.iter().any(|v| !v.is_finite()) {
        return Err(PcaError::NumericalDegeneracy(
            "Eigensolver returned non-finite eigenvalues.".to_string(),
        ));
    }
    let largest = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let floor = -tolerance.max(f64::EPSILON * eigenvalues.len() as f64) * largest;
    for &value in eigenvalues.iter() {
        if value < floor {
            return Err(PcaError::NumericalDegeneracy(format!(
                "Covariance matrix has a negative eigenvalue {:e} (largest magnitude {:e}).",
                value, largest
            )));
        }
        if value < 0.0 {
            warn!("Eigenvalue {:e} is slightly negative; treating it as rounding noise.", value);
        }
    }
    Ok(())
}

/// Indices of `values` sorted descending. Stable, so tied values keep solver order.
fn descending_order(values: &Array1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    for pair in order.windows(2) {
        if values[pair[0]] == values[pair[1]] {
            debug!(
                "Eigenvalues at solver positions {} and {} are tied ({:e}); keeping solver order.",
                pair[0], pair[1], values[pair[0]]
            );
        }
    }
    order
}

/// Applies `convention` to eigenvectors stored one per row, in sorted order.
fn apply_sign_convention(eigenvectors: &mut Array2<f64>, convention: SignConvention) {
    for (position, mut row) in eigenvectors.axis_iter_mut(Axis(0)).enumerate() {
        let negate = match convention {
            SignConvention::AlternatingNegation => position % 2 != 0,
            SignConvention::LargestComponentPositive => {
                let mut pivot = 0.0_f64;
                for &v in row.iter() {
                    if v.abs() > pivot.abs() {
                        pivot = v;
                    }
                }
                pivot < 0.0
            }
        };
        if negate {
            row.mapv_inplace(|v| -v);
        }
    }
}
