//! Analysis configuration: every path, schema and window bound the pipeline needs.
//!
//! Defaults reproduce the usual Giraph/MapReduce experiment layout. A TOML file
//! only has to name the fields it changes:
//!
//! ```toml
//! input_dir = "MapReduce_S2"
//! output_dir = "MapReduce_S2_Figure"
//!
//! [origin]
//! mode = "activity"
//!
//! [window.report]
//! path = "MapReduce_S2/performance_report.txt"
//! iterations = 10
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    align::origin::{ActivityThresholds, CpuBusy, OriginMode},
    error::{AnalysisError, Result},
    ingest::loader::LoaderConfig,
};

pub const DEFAULT_INPUT_DIR: &str = "data/metrics";
pub const DEFAULT_OUTPUT_DIR: &str = "data/figures";
pub const DEFAULT_FILE_PREFIX: &str = "metrics_";
pub const DEFAULT_FILE_EXTENSION: &str = "csv";
pub const DEFAULT_WINDOW_END_SEC: f64 = 5300.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory scanned for `<file_prefix>*.<file_extension>` metrics files.
    pub input_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,

    /// Charts and summary tables land here; created if absent.
    pub output_dir: PathBuf,

    /// Free-form label used in chart titles and the text summary header.
    pub run_label: String,

    pub loader: LoaderConfig,
    pub origin: OriginConfig,
    pub window: WindowSpec,
    pub chart: ChartConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            run_label: "dstat".to_string(),
            loader: LoaderConfig::default(),
            origin: OriginConfig::default(),
            window: WindowSpec::default(),
            chart: ChartConfig::default(),
        }
    }
}

/// How the shared time origin is chosen, plus the activity thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub mode: OriginMode,
    /// CPU figure compared against `cpu_busy_pct`: `non_idle` (100 - idl) or `user_system`.
    pub busy: CpuBusy,
    /// CPU busy percentage above which a node counts as active.
    pub cpu_busy_pct: f64,
    /// Disk write rate (bytes/s) above which a node counts as active.
    pub disk_write_bytes_per_sec: f64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        let t = ActivityThresholds::default();
        Self {
            mode: OriginMode::GlobalStart,
            busy: t.busy,
            cpu_busy_pct: t.cpu_busy_pct,
            disk_write_bytes_per_sec: t.disk_write_bytes_per_sec,
        }
    }
}

impl OriginConfig {
    pub fn thresholds(&self) -> ActivityThresholds {
        ActivityThresholds {
            busy: self.busy,
            cpu_busy_pct: self.cpu_busy_pct,
            disk_write_bytes_per_sec: self.disk_write_bytes_per_sec,
        }
    }
}

/// Where the analysis window comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpec {
    /// Seconds relative to the shared origin.
    Offsets { start: f64, end: f64 },
    /// Absolute Unix epochs.
    Epochs { start: f64, end: f64 },
    /// `[0, total]` where total is the sum of the first `iterations`
    /// iteration times found in the performance report.
    Report { path: PathBuf, iterations: usize },
}

impl Default for WindowSpec {
    fn default() -> Self {
        WindowSpec::Offsets {
            start: 0.0,
            end: DEFAULT_WINDOW_END_SEC,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 600,
        }
    }
}

impl AnalysisConfig {
    /// Reads a TOML file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: AnalysisConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.loader.validate()?;

        match &self.window {
            WindowSpec::Offsets { start, end } | WindowSpec::Epochs { start, end } => {
                if !start.is_finite() || !end.is_finite() || end < start {
                    return Err(AnalysisError::Config(format!(
                        "window end ({}) must not precede start ({})",
                        end, start
                    )));
                }
            }
            WindowSpec::Report { iterations, .. } => {
                if *iterations == 0 {
                    return Err(AnalysisError::Config(
                        "window.report.iterations must be at least 1".into(),
                    ));
                }
            }
        }

        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(AnalysisError::Config("chart dimensions must be non-zero".into()));
        }

        Ok(())
    }
}
