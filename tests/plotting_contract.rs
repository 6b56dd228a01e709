use eigen_pca::{DataView, JsonPlotRenderer, PcaEngine, PcaError, PlotRenderer, PlotStyle};
use ndarray::{array, Array2};
use std::fs;

fn iris_like() -> (Array2<f64>, Vec<usize>) {
    let data = array![
        [5.1, 3.5, 1.4, 0.2],
        [4.9, 3.0, 1.4, 0.2],
        [4.7, 3.2, 1.3, 0.2],
        [7.0, 3.2, 4.7, 1.4],
        [6.4, 3.2, 4.5, 1.5],
        [6.9, 3.1, 4.9, 1.5],
        [6.3, 3.3, 6.0, 2.5],
        [5.8, 2.7, 5.1, 1.9],
        [7.1, 3.0, 5.9, 2.1],
    ];
    let labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
    (data, labels)
}

#[test]
fn original_view_needs_no_fit() {
    let (data, labels) = iris_like();
    let engine = PcaEngine::new(data, "iris");
    let plot = engine.scatter_plot(DataView::Original, &labels, &[0, 2, 3]).unwrap();
    assert_eq!(plot.dims(), 3);
    assert_eq!(plot.axis_names(), &["feature 0", "feature 2", "feature 3"]);
    assert_eq!(plot.title(), "Original Data (iris)");
}

#[test]
fn fitted_views_require_a_fit() {
    let (data, labels) = iris_like();
    let engine = PcaEngine::new(data, "iris");
    for view in [DataView::Reconstructed, DataView::Transformed] {
        let err = engine.scatter_plot(view, &labels, &[0, 1]).unwrap_err();
        assert!(matches!(err, PcaError::InvalidArgument(_)), "{:?}", err);
    }
    assert!(matches!(engine.scree_plot(), Err(PcaError::InvalidArgument(_))));
}

#[test]
fn transformed_view_has_one_row_per_instance() {
    let (data, labels) = iris_like();
    let mut engine = PcaEngine::new(data, "iris");
    engine.fit(3).unwrap();
    let plot = engine.scatter_plot(DataView::Transformed, &labels, &[0, 1]).unwrap();
    let fit = engine.last_fit().unwrap();
    assert_eq!(plot.points().dim(), (9, 2));
    assert_eq!(plot.points().column(0), fit.transformed_data().row(0));
    assert_eq!(plot.points().column(1), fit.transformed_data().row(1));
    assert_eq!(plot.axis_names(), &["PC1", "PC2"]);

    // Only 3 axes were kept.
    let err = engine.scatter_plot(DataView::Transformed, &labels, &[0, 3]).unwrap_err();
    assert!(matches!(err, PcaError::ShapeMismatch(_)));
}

#[test]
fn labels_must_match_instances() {
    let (data, _) = iris_like();
    let mut engine = PcaEngine::new(data, "iris");
    engine.fit(2).unwrap();
    let err = engine.scatter_plot(DataView::Reconstructed, &[0, 1], &[0, 1]).unwrap_err();
    assert!(matches!(err, PcaError::ShapeMismatch(_)));
}

#[test]
fn renderer_persists_scatter_and_scree_to_files() {
    let (data, labels) = iris_like();
    let mut engine = PcaEngine::new(data, "iris");
    engine.fit(4).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let style = PlotStyle::default();
    let mut renderer = JsonPlotRenderer::with_writer(Vec::new());

    let scatter = engine.scatter_plot(DataView::Reconstructed, &labels, &[0, 1, 2, 3]).unwrap();
    let scatter_path = dir.path().join("scatter_plot_4D.json");
    renderer.render_scatter(&scatter, &style, Some(&scatter_path)).unwrap();

    let scree = engine.scree_plot().unwrap();
    let scree_path = dir.path().join("scree_plot_iris.json");
    renderer.render_scree(&scree, &style, Some(&scree_path)).unwrap();

    // Nothing goes to the interactive sink when a path is given.
    assert!(renderer.into_inner().is_empty());

    let scatter_json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&scatter_path).unwrap()).unwrap();
    assert_eq!(scatter_json["dims"], 4);
    let first_size = scatter_json["points"][0]["size"].as_f64().unwrap();
    let expected_size = engine.last_fit().unwrap().reconstructed_data()[[0, 3]] * style.size_scale_4d;
    assert!((first_size - expected_size).abs() < 1e-9);

    let scree_json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&scree_path).unwrap()).unwrap();
    assert_eq!(scree_json["kind"], "scree");
    assert_eq!(scree_json["bars"].as_array().unwrap().len(), 4);
    let cumulative = scree_json["cumulative"].as_array().unwrap();
    assert!((cumulative[3].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(scree_json["cumulative_color"], style.palette[1].as_str());
}
