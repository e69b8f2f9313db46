//! # dstat Analysis Entry Point
//!
//! Loads every node's dstat capture, aligns them on one clock, clips to the
//! analysis window, then writes one comparison chart per metric and a
//! per-node summary table.
//!
//! ## Usage
//! - `analyze`: default layout (`data/metrics` to `data/figures`).
//! - `analyze run.toml`: overrides from a TOML file; see `config`.
//!
//! ## Outputs
//! - `<output_dir>/<metric>.png`: one line per node.
//! - `<output_dir>/summary.csv`, `<output_dir>/summary.txt`.
//!
//! Verbosity follows `RUST_LOG` (default `info`).

use std::{env, error::Error, path::PathBuf, process};

use dstat_analysis::{config::AnalysisConfig, pipeline};
use log::{error, info};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = match env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Using configuration {:?}", path);
            AnalysisConfig::from_file(&path)?
        }
        None => AnalysisConfig::default(),
    };

    match pipeline::run(&cfg) {
        Ok(report) => {
            println!(
                "Window [{:.1}s, {:.1}s] after epoch {:.3}: {} nodes",
                report.window.0,
                report.window.1,
                report.origin.epoch,
                report.nodes.len()
            );
            for path in report.charts.iter().chain(&report.summary_files) {
                println!("  {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            process::exit(1);
        }
    }
}
