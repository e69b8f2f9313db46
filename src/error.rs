//! Error type shared by every pipeline stage.
//!
//! Per-row and per-file problems never surface here: the loader logs them and
//! moves on. Only whole-batch preconditions (no usable inputs, an empty window,
//! a missing report) and configuration mistakes become an `AnalysisError`.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("performance report not found: {0:?}")]
    ReportMissing(PathBuf),

    #[error("no 'Iteration_<k>_Total Iteraction Time : <ms> ms' entries found in performance report")]
    NoIterations,

    #[error("no valid metrics files were loaded")]
    NoValidInputs,

    #[error("no samples fall inside the analysis window [{start:.3}s, {end:.3}s]")]
    NoDataInWindow { start: f64, end: f64 },

    #[error("chart rendering failed: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
