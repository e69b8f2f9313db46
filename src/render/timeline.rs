//! Gantt-style phase timeline: one horizontal lane, one bar per phase,
//! coloured by phase kind.

use std::path::Path;

use log::info;
use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    error::Result,
    ingest::timings::{PhaseKind, Timeline},
    render::charts::render_err,
};

/// Bars shorter than this stay unlabelled.
const LABEL_MIN_SECS: f64 = 2.0;

const KIND_ORDER: [PhaseKind; 4] = [
    PhaseKind::Setup,
    PhaseKind::Compute,
    PhaseKind::Cleanup,
    PhaseKind::Other,
];

pub fn kind_color(kind: PhaseKind) -> RGBColor {
    match kind {
        PhaseKind::Setup => RGBColor(214, 39, 40),
        PhaseKind::Compute => RGBColor(31, 119, 180),
        PhaseKind::Cleanup => RGBColor(255, 127, 14),
        PhaseKind::Other => RGBColor(128, 128, 128),
    }
}

fn x_extent(timeline: &Timeline) -> f64 {
    if timeline.total_s > 0.0 {
        timeline.total_s * 1.05
    } else {
        1.0
    }
}

pub fn render_timeline(timeline: &Timeline, title: &str, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(20)
        .build_cartesian_2d(0.0..x_extent(timeline), -1.0..1.0)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc("Time (Seconds)")
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(render_err)?;

    // One series per kind so each gets a single legend entry.
    for kind in KIND_ORDER {
        let color = kind_color(kind);
        let bars: Vec<_> = timeline
            .spans
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Rectangle::new([(s.start_s, -0.4), (s.start_s + s.duration_s, 0.4)], color.filled()))
            .collect();
        if bars.is_empty() {
            continue;
        }
        chart
            .draw_series(bars)
            .map_err(render_err)?
            .label(kind.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 16, y + 5)], color.filled()));
    }

    // Thin white separators between adjacent bars.
    chart
        .draw_series(timeline.spans.iter().map(|s| {
            Rectangle::new(
                [(s.start_s, -0.4), (s.start_s + s.duration_s, 0.4)],
                WHITE.stroke_width(1),
            )
        }))
        .map_err(render_err)?;

    let label_style = ("sans-serif", 13)
        .into_font()
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart
        .draw_series(
            timeline
                .spans
                .iter()
                .filter(|s| s.duration_s > LABEL_MIN_SECS)
                .map(|s| {
                    Text::new(
                        format!("{} {:.1}s", s.phase, s.duration_s),
                        (s.start_s + s.duration_s / 2.0, 0.0),
                        label_style.clone(),
                    )
                }),
        )
        .map_err(render_err)?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    info!("Timeline saved: {:?}", path);
    Ok(())
}
