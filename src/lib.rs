// Principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod covariance;
pub mod diagnostics;
pub mod error;
pub mod linalg_backends;
pub mod pca;
pub mod plotting;

pub use covariance::CovarianceStrategy;
pub use error::{PcaError, PcaResult};
pub use pca::{EigenSolverKind, PcaConfig, PcaEngine, PcaFit, SignConvention, DEFAULT_AXES};
pub use plotting::{DataView, JsonPlotRenderer, PlotRenderer, PlotStyle, ScatterPlot, ScreePlot};
