// src/error.rs

use thiserror::Error;

/// Errors produced while fitting a PCA model or preparing plot payloads.
///
/// Every failure is terminal for the call that produced it; nothing is retried
/// and no partially computed state is kept.
#[derive(Debug, Error)]
pub enum PcaError {
    /// A caller-supplied parameter is outside its valid range,
    /// e.g. `axes` not in `[1, n_features]` or a scatter with 5 axes.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The data or its covariance cannot yield usable eigenpairs: fewer than
    /// two rows, non-finite values, zero total variance, clearly negative
    /// eigenvalues, or non-negligible imaginary parts from the general solver.
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Array dimensions disagree, e.g. a label vector whose length differs from
    /// the number of instances.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The linear algebra backend reported a failure.
    #[error("Eigensolver failed: {0}")]
    Solver(String),

    #[error("I/O error while writing plot output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize plot payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type PcaResult<T> = Result<T, PcaError>;
