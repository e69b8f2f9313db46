//! Per-metric overlay charts: one PNG per metric, one line per node.
//!
//! X axis: seconds since window start. Y axis: metric value, from zero.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{info, warn};
use plotters::prelude::*;

use crate::{
    align::window::WindowedSeries,
    error::{AnalysisError, Result},
    utils::metrics::{Metric, MetricRegistry},
};

pub(crate) fn render_err<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

/// Axis upper bound with a little headroom; 1.0 when everything is zero.
fn upper_bound(max: f64) -> f64 {
    if max > 0.0 { max * 1.05 } else { 1.0 }
}

/// Draws `metric` for every node into `path`. Returns `false` (and writes
/// nothing) when no node has a point to draw.
pub fn render_metric_chart(
    metric: &Metric,
    windowed: &BTreeMap<String, WindowedSeries>,
    title: &str,
    path: &Path,
    size: (u32, u32),
) -> Result<bool> {
    let lines: Vec<(&str, Vec<(f64, f64)>)> = windowed
        .values()
        .map(|s| (s.node.as_str(), metric.evaluate(s)))
        .filter(|(_, pts)| !pts.is_empty())
        .collect();

    if lines.is_empty() {
        warn!("{}: nothing to plot, chart skipped", metric.key);
        return Ok(false);
    }

    let x_max = lines
        .iter()
        .flat_map(|(_, pts)| pts.iter().map(|(x, _)| *x))
        .fold(0.0, f64::max);
    let y_max = lines
        .iter()
        .flat_map(|(_, pts)| pts.iter().map(|(_, y)| *y))
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max.max(1.0), 0.0..upper_bound(y_max))
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc(metric.y_label)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.2))
        .draw()
        .map_err(render_err)?;

    for (i, (node, pts)) in lines.into_iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(pts, color.stroke_width(2)))
            .map_err(render_err)?
            .label(node)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(true)
}

/// Renders every registered metric into `out_dir/<key>.png`; returns the files written.
pub fn render_all(
    registry: &MetricRegistry,
    windowed: &BTreeMap<String, WindowedSeries>,
    run_label: &str,
    out_dir: &Path,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for metric in registry.iter() {
        let path = out_dir.join(format!("{}.png", metric.key));
        let title = format!("{} ({})", metric.title, run_label);
        if render_metric_chart(metric, windowed, &title, &path, size)? {
            info!("Chart saved: {:?}", path);
            written.push(path);
        }
    }

    Ok(written)
}
