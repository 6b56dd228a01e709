use eigen_pca::{DataView, JsonPlotRenderer, PcaEngine, PlotRenderer, PlotStyle};
use ndarray::Array2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Three noisy clusters along a tilted line in 4 dimensions.
    let data = Array2::from_shape_fn((30, 4), |(i, j)| {
        let cluster = (i / 10) as f64;
        let jitter = ((i * 7 + j * 3) % 5) as f64 * 0.1;
        cluster * (j + 1) as f64 + jitter
    });
    let labels: Vec<usize> = (0..30).map(|i| i / 10).collect();

    let mut engine = PcaEngine::new(data, "clusters");
    let projected = engine.fit(2)?;
    println!("Projected shape: {:?}", projected.dim());

    let style = PlotStyle::default();
    let mut renderer = JsonPlotRenderer::new();
    renderer.render_scatter(&engine.scatter_plot(DataView::Transformed, &labels, &[0, 1])?, &style, None)?;
    renderer.render_scree(&engine.scree_plot()?, &style, None)?;
    Ok(())
}
