// src/plotting.rs

//! Contract between the PCA engine and whatever draws its results.
//!
//! The engine only hands over finished arrays: a [`ScatterPlot`] (2, 3 or 4
//! selected columns plus one label per instance) or a [`ScreePlot`] (explained
//! variance ratios and their running total). Styling travels in an explicit
//! [`PlotStyle`] value. Renderers never write back into the engine.

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::diagnostics;
use crate::error::{PcaError, PcaResult};
use crate::pca::PcaEngine;

/// The tab20 qualitative palette.
pub const TAB20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896", "#9467bd", "#c5b0d5",
    "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7", "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Which matrix a scatter plot is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataView {
    /// The dataset as given.
    Original,
    /// The reconstruction from the kept axes.
    Reconstructed,
    /// The projected coordinates, one row per instance.
    Transformed,
}

impl DataView {
    pub fn title(&self) -> &'static str {
        match self {
            DataView::Original => "Original Data",
            DataView::Reconstructed => "Reconstructed Data",
            DataView::Transformed => "Transformed Data",
        }
    }
}

/// Visual configuration handed to a renderer with every call.
#[derive(Debug, Clone)]
pub struct PlotStyle {
    /// Colors cycled by label value.
    pub palette: Vec<String>,
    /// Marker size for 2D and 3D scatters.
    pub marker_size: f64,
    /// Multiplier applied to the fourth coordinate to get a marker size in 4D scatters.
    pub size_scale_4d: f64,
    /// Width and height in inches.
    pub figure_size: (f64, f64),
    /// Palette index of the cumulative variance line.
    pub cumulative_color_index: usize,
    /// Palette index of the per-component bars.
    pub bar_color_index: usize,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            palette: TAB20.iter().map(|c| c.to_string()).collect(),
            marker_size: 15.0,
            size_scale_4d: 10.0,
            figure_size: (10.0, 10.0),
            cumulative_color_index: 1,
            bar_color_index: 2,
        }
    }
}

impl PlotStyle {
    /// Color assigned to `index`, cycling through the palette.
    /// `None` if the palette is empty.
    pub fn color_for(&self, index: usize) -> Option<&str> {
        if self.palette.is_empty() {
            return None;
        }
        Some(self.palette[index % self.palette.len()].as_str())
    }

    fn require_color(&self, index: usize) -> PcaResult<&str> {
        self.color_for(index)
            .ok_or_else(|| PcaError::InvalidArgument("Plot style palette is empty.".to_string()))
    }
}

/// Columns selected for a scatter plot, one row per instance.
#[derive(Debug, Clone)]
pub struct ScatterPlot {
    points: Array2<f64>,
    labels: Vec<usize>,
    axes: Vec<usize>,
    axis_names: Vec<String>,
    title: String,
}

impl ScatterPlot {
    /// Selects `axes` columns from `source` (rows are instances).
    ///
    /// # Errors
    /// - `InvalidArgument` unless 2 to 4 axes are requested.
    /// - `ShapeMismatch` if an axis index is out of range, if `labels` does not have
    ///   one entry per row, or if `axis_names` does not have one entry per axis.
    pub fn new(
        source: &ArrayView2<f64>,
        labels: &[usize],
        axes: &[usize],
        axis_names: Vec<String>,
        title: impl Into<String>,
    ) -> PcaResult<Self> {
        if !(2..=4).contains(&axes.len()) {
            return Err(PcaError::InvalidArgument(format!(
                "Scatter plots show 2 to 4 axes, got {}.",
                axes.len()
            )));
        }
        if let Some(&bad) = axes.iter().find(|&&a| a >= source.ncols()) {
            return Err(PcaError::ShapeMismatch(format!(
                "Axis index {} is out of range for data with {} columns.",
                bad,
                source.ncols()
            )));
        }
        if labels.len() != source.nrows() {
            return Err(PcaError::ShapeMismatch(format!(
                "Got {} labels for {} instances.",
                labels.len(),
                source.nrows()
            )));
        }
        if axis_names.len() != axes.len() {
            return Err(PcaError::ShapeMismatch(format!(
                "Got {} axis names for {} axes.",
                axis_names.len(),
                axes.len()
            )));
        }
        Ok(Self {
            points: source.select(Axis(1), axes),
            labels: labels.to_vec(),
            axes: axes.to_vec(),
            axis_names,
            title: title.into(),
        })
    }

    /// Number of displayed dimensions (2, 3 or 4).
    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    /// Selected coordinates. Shape: (n_instances, dims)
    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Column indices of the source matrix that were selected.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn axis_names(&self) -> &[String] {
        &self.axis_names
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Marker size per instance. In 4D the fourth coordinate drives the size.
    pub fn marker_sizes(&self, style: &PlotStyle) -> Vec<f64> {
        if self.dims() == 4 {
            self.points.column(3).iter().map(|v| v * style.size_scale_4d).collect()
        } else {
            vec![style.marker_size; self.points.nrows()]
        }
    }
}

/// Per-component explained variance with its running total.
#[derive(Debug, Clone)]
pub struct ScreePlot {
    ratios: Array1<f64>,
    cumulative: Array1<f64>,
    title: String,
}

impl ScreePlot {
    /// # Errors
    /// `InvalidArgument` if `ratios` is empty.
    pub fn from_ratios(ratios: &Array1<f64>, title: impl Into<String>) -> PcaResult<Self> {
        if ratios.is_empty() {
            return Err(PcaError::InvalidArgument(
                "A scree plot needs at least one variance ratio.".to_string(),
            ));
        }
        Ok(Self {
            ratios: ratios.clone(),
            cumulative: diagnostics::cumulative_sum(&ratios.view()),
            title: title.into(),
        })
    }

    pub fn ratios(&self) -> &Array1<f64> {
        &self.ratios
    }

    pub fn cumulative(&self) -> &Array1<f64> {
        &self.cumulative
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Something that can draw the engine's plots.
///
/// When `output` is `Some`, the rendering is persisted there; otherwise it is shown
/// through the renderer's interactive channel.
pub trait PlotRenderer {
    fn render_scatter(&mut self, plot: &ScatterPlot, style: &PlotStyle, output: Option<&Path>) -> PcaResult<()>;
    fn render_scree(&mut self, plot: &ScreePlot, style: &PlotStyle, output: Option<&Path>) -> PcaResult<()>;
}

#[derive(Debug, Serialize)]
struct ScatterPoint<'a> {
    coords: Vec<f64>,
    label: usize,
    color: &'a str,
    size: f64,
}

#[derive(Debug, Serialize)]
struct ScatterPayload<'a> {
    kind: &'static str,
    title: &'a str,
    dims: usize,
    axis_names: &'a [String],
    figure_size: (f64, f64),
    points: Vec<ScatterPoint<'a>>,
}

#[derive(Debug, Serialize)]
struct ScreeBar<'a> {
    component: usize,
    ratio: f64,
    color: &'a str,
}

#[derive(Debug, Serialize)]
struct ScreePayload<'a> {
    kind: &'static str,
    title: &'a str,
    x_label: &'static str,
    y_label: &'static str,
    figure_size: (f64, f64),
    bars: Vec<ScreeBar<'a>>,
    cumulative: Vec<f64>,
    cumulative_color: &'a str,
}

/// Renderer that emits the styled plot description as JSON, for a front end
/// (or a test) to draw. Without an output path the JSON goes to `sink`.
pub struct JsonPlotRenderer<W: Write> {
    sink: W,
}

impl JsonPlotRenderer<io::Stdout> {
    pub fn new() -> Self {
        Self { sink: io::stdout() }
    }
}

impl Default for JsonPlotRenderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonPlotRenderer<W> {
    pub fn with_writer(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn emit<T: Serialize>(&mut self, payload: &T, output: Option<&Path>) -> PcaResult<()> {
        match output {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, payload)?;
                writer.flush()?;
                info!("Wrote plot to {:?}", path);
            }
            None => {
                serde_json::to_writer_pretty(&mut self.sink, payload)?;
                writeln!(self.sink)?;
                self.sink.flush()?;
            }
        }
        Ok(())
    }
}

impl<W: Write> PlotRenderer for JsonPlotRenderer<W> {
    fn render_scatter(&mut self, plot: &ScatterPlot, style: &PlotStyle, output: Option<&Path>) -> PcaResult<()> {
        let sizes = plot.marker_sizes(style);
        let mut points = Vec::with_capacity(plot.points.nrows());
        for ((row, &label), size) in plot.points.axis_iter(Axis(0)).zip(plot.labels.iter()).zip(sizes) {
            points.push(ScatterPoint {
                coords: row.to_vec(),
                label,
                color: style.require_color(label)?,
                size,
            });
        }
        debug!("Rendering {}D scatter '{}' with {} points.", plot.dims(), plot.title, points.len());
        let payload = ScatterPayload {
            kind: "scatter",
            title: &plot.title,
            dims: plot.dims(),
            axis_names: &plot.axis_names,
            figure_size: style.figure_size,
            points,
        };
        self.emit(&payload, output)
    }

    fn render_scree(&mut self, plot: &ScreePlot, style: &PlotStyle, output: Option<&Path>) -> PcaResult<()> {
        let bar_color = style.require_color(style.bar_color_index)?;
        let bars = plot
            .ratios
            .iter()
            .enumerate()
            .map(|(component, &ratio)| ScreeBar { component, ratio, color: bar_color })
            .collect();
        let payload = ScreePayload {
            kind: "scree",
            title: &plot.title,
            x_label: "Number of Components",
            y_label: "Variance (%)",
            figure_size: style.figure_size,
            bars,
            cumulative: plot.cumulative.to_vec(),
            cumulative_color: style.require_color(style.cumulative_color_index)?,
        };
        self.emit(&payload, output)
    }
}

impl PcaEngine {
    /// Builds a scatter plot of `axes` columns from the chosen view.
    ///
    /// `Reconstructed` and `Transformed` read the latest fit; `Transformed` shows
    /// one row per instance with columns `PC1..PCk`.
    ///
    /// # Errors
    /// `InvalidArgument` if the view needs a fit and none exists, plus the
    /// validation errors of [`ScatterPlot::new`].
    pub fn scatter_plot(&self, view: DataView, labels: &[usize], axes: &[usize]) -> PcaResult<ScatterPlot> {
        let title = format!("{} ({})", view.title(), self.name());
        let source = match view {
            DataView::Original => self.data().view(),
            DataView::Reconstructed => self.require_fit()?.reconstructed_data().view(),
            DataView::Transformed => self.require_fit()?.transformed_data().t(),
        };
        let axis_names = axes
            .iter()
            .map(|&a| match view {
                DataView::Transformed => format!("PC{}", a + 1),
                _ => format!("feature {}", a),
            })
            .collect();
        ScatterPlot::new(&source, labels, axes, axis_names, title)
    }

    /// Builds the scree plot of the latest fit.
    pub fn scree_plot(&self) -> PcaResult<ScreePlot> {
        let fit = self.require_fit()?;
        ScreePlot::from_ratios(
            fit.explained_variance_ratio(),
            format!("Explained Variance ({})", self.name()),
        )
    }

    fn require_fit(&self) -> PcaResult<&crate::pca::PcaFit> {
        self.last_fit().ok_or_else(|| {
            PcaError::InvalidArgument(format!("PCA on '{}' has not been fitted yet.", self.name()))
        })
    }
}
