//! One analysis run, end to end:
//! discover → load → origin → window → charts → summary.
//!
//! Each stage is a plain function over owned data; the only state shared
//! between them is the node → series map built by the loader.

use std::{
    collections::BTreeMap,
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    align::{
        origin::{Origin, OriginSource, detect_origin},
        window::{Window, WindowedSeries, window_all},
    },
    config::{AnalysisConfig, WindowSpec},
    error::{AnalysisError, Result},
    ingest::{
        loader::{Series, discover_inputs, load_all},
        report::parse_report_file,
    },
    render::charts::render_all,
    utils::{
        export::run_exports,
        metrics::{MetricRegistry, SummaryRow, summarize},
    },
};

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub origin: Origin,
    pub window: (f64, f64),
    pub nodes: Vec<String>,
    pub charts: Vec<PathBuf>,
    pub summary_files: Vec<PathBuf>,
    pub summary: Vec<SummaryRow>,
}

/// Turns the configured window into concrete bounds. A report-backed window
/// reads the report now and becomes `[0, total]` seconds after the origin.
pub fn resolve_window(window: &WindowSpec) -> Result<Window> {
    match window {
        WindowSpec::Offsets { start, end } => Ok(Window::Offsets {
            start: *start,
            end: *end,
        }),
        WindowSpec::Epochs { start, end } => Ok(Window::Epochs {
            start: *start,
            end: *end,
        }),
        WindowSpec::Report { path, iterations } => {
            let total = parse_report_file(path, *iterations)?;
            Ok(Window::Offsets {
                start: 0.0,
                end: total,
            })
        }
    }
}

/// Loads every matching file in the input directory.
pub fn load_inputs(cfg: &AnalysisConfig) -> Result<BTreeMap<String, Series>> {
    let paths = discover_inputs(&cfg.input_dir, &cfg.file_prefix, &cfg.file_extension)?;
    info!("Found {} metrics files in {:?}", paths.len(), cfg.input_dir);

    let all = load_all(&paths, &cfg.file_prefix, &cfg.loader);
    if all.is_empty() {
        return Err(AnalysisError::NoValidInputs);
    }
    Ok(all)
}

fn log_origin(origin: &Origin) {
    match &origin.source {
        OriginSource::GlobalStart => info!("Origin: earliest sample, epoch {:.3}", origin.epoch),
        OriginSource::Activity { node } => {
            info!("Origin: first activity on {}, epoch {:.3}", node, origin.epoch)
        }
        OriginSource::ActivityFallback => warn!(
            "No node crossed the activity thresholds; falling back to earliest sample (epoch {:.3})",
            origin.epoch
        ),
    }
}

/// Windows the loaded series according to `cfg`, returning the origin used.
pub fn align(
    cfg: &AnalysisConfig,
    all: &BTreeMap<String, Series>,
) -> Result<(Origin, Window, BTreeMap<String, WindowedSeries>)> {
    let window = resolve_window(&cfg.window)?;
    let origin = detect_origin(all, cfg.origin.mode, &cfg.origin.thresholds())
        .ok_or(AnalysisError::NoValidInputs)?;
    log_origin(&origin);

    let windowed = window_all(all, origin.epoch, &window)?;
    Ok((origin, window, windowed))
}

pub fn run(cfg: &AnalysisConfig) -> Result<RunReport> {
    run_with_registry(cfg, &MetricRegistry::default())
}

pub fn run_with_registry(cfg: &AnalysisConfig, registry: &MetricRegistry) -> Result<RunReport> {
    cfg.validate()?;

    let all = load_inputs(cfg)?;
    let (origin, window, windowed) = align(cfg, &all)?;

    let out_dir: &Path = &cfg.output_dir;
    create_dir_all(out_dir).map_err(|e| AnalysisError::io(out_dir, e))?;

    let charts = render_all(
        registry,
        &windowed,
        &cfg.run_label,
        out_dir,
        (cfg.chart.width, cfg.chart.height),
    )?;

    let summary = summarize(&windowed, registry);
    let summary_files = run_exports(&summary, registry, &cfg.run_label, out_dir)?;

    info!(
        "Done: {} nodes, {} charts written to {:?}",
        windowed.len(),
        charts.len(),
        out_dir
    );

    Ok(RunReport {
        window: window.resolve(origin.epoch),
        origin,
        nodes: windowed.keys().cloned().collect(),
        charts,
        summary_files,
        summary,
    })
}
