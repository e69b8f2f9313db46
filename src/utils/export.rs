//! Summary table export.
//!
//! Two outputs per run, written into the output directory:
//! - `summary.csv`: one row per node: `node,duration_s`, then `<key>_avg`,
//!   `<key>_peak`, `<key>_p95` for every registered metric (3 decimals).
//! - `summary.txt`: the same averages and peaks as an aligned text table,
//!   headed by the run label, ready to paste into the write-up.

use std::{
    fs::{create_dir_all, write},
    path::{Path, PathBuf},
};

use csv::Writer;
use log::info;

use crate::{
    error::{AnalysisError, Result},
    utils::metrics::{MetricRegistry, MetricStats, SummaryRow},
};

pub const SUMMARY_CSV: &str = "summary.csv";
pub const SUMMARY_TXT: &str = "summary.txt";

fn fmt3(v: f64) -> String {
    format!("{:.3}", v)
}

fn cell(stats: Option<&MetricStats>, pick: fn(&MetricStats) -> f64) -> String {
    stats.map(|s| fmt3(pick(s))).unwrap_or_default()
}

pub fn csv_header(registry: &MetricRegistry) -> Vec<String> {
    let mut header = vec!["node".to_string(), "duration_s".to_string()];
    for m in registry.iter() {
        header.push(format!("{}_avg", m.key));
        header.push(format!("{}_peak", m.key));
        header.push(format!("{}_p95", m.key));
    }
    header
}

/// Writes the summary rows as CSV. Empty stats become empty cells.
pub fn export_summary_csv(rows: &[SummaryRow], registry: &MetricRegistry, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(csv_header(registry))?;

    for row in rows {
        let mut record = vec![row.node.clone(), fmt3(row.duration_s)];
        for m in registry.iter() {
            let st = row.get(m.key);
            record.push(cell(st, |s| s.mean));
            record.push(cell(st, |s| s.peak));
            record.push(cell(st, |s| s.p95));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| AnalysisError::io(path, e))?;
    Ok(())
}

/// Aligned plain-text table of averages and peaks.
pub fn render_summary_table(rows: &[SummaryRow], registry: &MetricRegistry, title: &str) -> String {
    let mut header = vec!["Node".to_string(), "Duration(s)".to_string()];
    for m in registry.iter() {
        header.push(format!("{}_avg", m.key));
        header.push(format!("{}_peak", m.key));
    }

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut line = vec![row.node.clone(), fmt3(row.duration_s)];
            for m in registry.iter() {
                let st = row.get(m.key);
                line.push(cell(st, |s| s.mean));
                line.push(cell(st, |s| s.peak));
            }
            line
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|l| l[i].len())
                .chain(std::iter::once(header[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    format!("{:<w$}", c, w = widths[i])
                } else {
                    format!("{:>w$}", c, w = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let header_line = format_line(&header);
    let mut out = format!("=== {} ===\n\n", title);
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&"=".repeat(header_line.len()));
    out.push('\n');
    for line in &body {
        out.push_str(&format_line(line));
        out.push('\n');
    }
    out
}

pub fn export_summary_txt(
    rows: &[SummaryRow],
    registry: &MetricRegistry,
    title: &str,
    path: &Path,
) -> Result<()> {
    write(path, render_summary_table(rows, registry, title)).map_err(|e| AnalysisError::io(path, e))
}

/// Writes both summary files into `out_dir` (created if needed); returns their paths.
pub fn run_exports(
    rows: &[SummaryRow],
    registry: &MetricRegistry,
    title: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    create_dir_all(out_dir).map_err(|e| AnalysisError::io(out_dir, e))?;

    let csv_path = out_dir.join(SUMMARY_CSV);
    export_summary_csv(rows, registry, &csv_path)?;
    info!("Summary exported to: {:?}", csv_path);

    let txt_path = out_dir.join(SUMMARY_TXT);
    export_summary_txt(rows, registry, title, &txt_path)?;
    info!("Summary table written to: {:?}", txt_path);

    Ok(vec![csv_path, txt_path])
}
